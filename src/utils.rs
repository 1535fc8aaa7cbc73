//! Utility functions for the matchmaking engine

use crate::types::QueueEntry;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique match ID
pub fn generate_match_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds an entry has been waiting at `now`, never negative
pub fn wait_seconds(entry: &QueueEntry, now: DateTime<Utc>) -> i64 {
    (now - entry.enqueued_at).num_seconds().max(0)
}

/// Spread between the highest and lowest party MMR in a slice
pub fn mmr_range(entries: &[QueueEntry]) -> i32 {
    let Some(first) = entries.first() else {
        return 0;
    };
    let mut min = first.avg_mmr;
    let mut max = first.avg_mmr;
    for entry in entries {
        min = min.min(entry.avg_mmr);
        max = max.max(entry.avg_mmr);
    }
    max - min
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(mmr: i32, enqueued_at: DateTime<Utc>) -> QueueEntry {
        QueueEntry {
            party_id: "party".to_string(),
            region: "us-west".to_string(),
            mode: "ranked".to_string(),
            team_size: 5,
            party_size: 1,
            avg_mmr: mmr,
            player_ids: vec!["p0".to_string()],
            enqueued_at,
        }
    }

    #[test]
    fn test_generate_unique_match_ids() {
        let id1 = generate_match_id();
        let id2 = generate_match_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_wait_seconds() {
        let now = current_timestamp();
        let e = entry(1500, now - Duration::seconds(30));
        assert_eq!(wait_seconds(&e, now), 30);

        // Timestamps from the future clamp to zero
        let e = entry(1500, now + Duration::seconds(30));
        assert_eq!(wait_seconds(&e, now), 0);
    }

    #[test]
    fn test_mmr_range() {
        let now = current_timestamp();
        let entries = vec![entry(1400, now), entry(1650, now), entry(1500, now)];
        assert_eq!(mmr_range(&entries), 250);
        assert_eq!(mmr_range(&[]), 0);
    }
}
