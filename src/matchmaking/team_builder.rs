//! Team formation from a bucket's candidate list
//!
//! Candidates arrive oldest first. The search expands prefixes of that list,
//! so the oldest party is part of every combination considered and cannot be
//! skipped in favor of a later arrival. The first prefix that passes the
//! tolerance gate, balances into full teams, and clears the quality floor
//! wins; there is no exhaustive search for the best-scoring prefix.

use crate::types::{PartyId, PlayerId, QueueEntry};
use crate::utils::mmr_range;

/// Normalization cap for the team-balance sub-score
const BALANCE_NORM: f64 = 500.0;

/// Normalization cap for the variance sub-score
const VARIANCE_NORM: f64 = 1000.0;

/// An assembled match before the engine stamps identity and bucket fields
#[derive(Debug, Clone)]
pub struct MatchDraft {
    /// One roster per team, each summing to exactly `team_size` players
    pub teams: Vec<Vec<PlayerId>>,
    pub party_ids: Vec<PartyId>,
    pub avg_mmr: i32,
    pub mmr_variance: i32,
    pub quality_score: f64,
}

/// Algorithms for forming balanced teams from queue entries
pub struct TeamBuilder;

impl TeamBuilder {
    /// Attempt to form a match from an oldest-first candidate list.
    ///
    /// `mmr_tolerance` is the widest permitted party-MMR spread, normally the
    /// band of the oldest candidate. Returns `None` when no prefix of the
    /// list yields a legal match at or above `min_quality`.
    pub fn try_form_match(
        entries: &[QueueEntry],
        team_size: usize,
        num_teams: usize,
        mmr_tolerance: i32,
        min_quality: f64,
    ) -> Option<MatchDraft> {
        if entries.is_empty() || team_size == 0 {
            return None;
        }

        let required_players = team_size * num_teams;
        let total_available: usize = entries.iter().map(|e| e.party_size).sum();
        if total_available < required_players {
            return None;
        }

        let mut prefix_players = entries[0].party_size;
        for len in 2..=entries.len() {
            prefix_players += entries[len - 1].party_size;
            if prefix_players < required_players {
                continue;
            }

            let prefix = &entries[..len];
            if mmr_range(prefix) > mmr_tolerance {
                continue;
            }

            let Some(teams) = Self::balance_teams(prefix, team_size, num_teams) else {
                continue;
            };

            let draft = Self::build_draft(prefix, &teams);
            if draft.quality_score < min_quality {
                continue;
            }
            return Some(draft);
        }

        None
    }

    /// Greedy deterministic balancing pass.
    ///
    /// Entries are taken highest MMR first (older entry, then lexicographic
    /// party id, on ties) and each is assigned to the team with the lowest
    /// summed weighted MMR that still has room; MMR ties go to the smaller
    /// roster, then the lower index. Returns `None` unless every team ends
    /// up with exactly `team_size` players.
    fn balance_teams<'a>(
        prefix: &'a [QueueEntry],
        team_size: usize,
        num_teams: usize,
    ) -> Option<Vec<Vec<&'a QueueEntry>>> {
        let mut order: Vec<&QueueEntry> = prefix.iter().collect();
        order.sort_by(|a, b| {
            b.avg_mmr
                .cmp(&a.avg_mmr)
                .then_with(|| a.enqueued_at.cmp(&b.enqueued_at))
                .then_with(|| a.party_id.cmp(&b.party_id))
        });

        let mut teams: Vec<Vec<&QueueEntry>> = vec![Vec::new(); num_teams];
        let mut mmr_sums = vec![0i64; num_teams];
        let mut player_counts = vec![0usize; num_teams];

        for entry in order {
            let mut target: Option<usize> = None;
            for idx in 0..num_teams {
                if player_counts[idx] + entry.party_size > team_size {
                    continue;
                }
                target = match target {
                    None => Some(idx),
                    Some(best) => {
                        let better = mmr_sums[idx] < mmr_sums[best]
                            || (mmr_sums[idx] == mmr_sums[best]
                                && player_counts[idx] < player_counts[best]);
                        if better {
                            Some(idx)
                        } else {
                            Some(best)
                        }
                    }
                };
            }

            // No team can take this party without overflowing; the prefix
            // is infeasible at this length.
            let idx = target?;
            teams[idx].push(entry);
            mmr_sums[idx] += entry.avg_mmr as i64 * entry.party_size as i64;
            player_counts[idx] += entry.party_size;
        }

        if player_counts.iter().any(|&count| count != team_size) {
            return None;
        }
        Some(teams)
    }

    /// Assemble the draft and score it
    fn build_draft(prefix: &[QueueEntry], teams: &[Vec<&QueueEntry>]) -> MatchDraft {
        let mut rosters: Vec<Vec<PlayerId>> = Vec::with_capacity(teams.len());
        let mut party_ids: Vec<PartyId> = Vec::with_capacity(prefix.len());

        for team in teams {
            let mut roster = Vec::new();
            for entry in team {
                roster.extend(entry.player_ids.iter().cloned());
                party_ids.push(entry.party_id.clone());
            }
            rosters.push(roster);
        }

        let mmr_variance = Self::weighted_mmr_stddev(prefix);
        let quality_score = Self::quality_score(teams, mmr_variance);

        MatchDraft {
            teams: rosters,
            party_ids,
            avg_mmr: Self::weighted_avg_mmr(prefix),
            mmr_variance,
            quality_score,
        }
    }

    /// Player-weighted mean MMR across parties, truncated to an integer
    fn weighted_avg_mmr(entries: &[QueueEntry]) -> i32 {
        let mut total_mmr = 0i64;
        let mut total_players = 0i64;
        for entry in entries {
            total_mmr += entry.avg_mmr as i64 * entry.party_size as i64;
            total_players += entry.party_size as i64;
        }
        if total_players == 0 {
            return 0;
        }
        (total_mmr / total_players) as i32
    }

    /// Player-weighted population standard deviation of party MMR,
    /// rounded to a non-negative integer
    fn weighted_mmr_stddev(entries: &[QueueEntry]) -> i32 {
        let total_players: f64 = entries.iter().map(|e| e.party_size as f64).sum();
        if total_players == 0.0 {
            return 0;
        }

        let mean: f64 = entries
            .iter()
            .map(|e| e.avg_mmr as f64 * e.party_size as f64)
            .sum::<f64>()
            / total_players;

        let variance: f64 = entries
            .iter()
            .map(|e| {
                let diff = e.avg_mmr as f64 - mean;
                diff * diff * e.party_size as f64
            })
            .sum::<f64>()
            / total_players;

        variance.sqrt().round().max(0.0) as i32
    }

    /// Fixed-weight quality model over three sub-scores.
    ///
    /// Balance compares player-weighted team means; variance penalizes
    /// overall skill spread; the wait sub-score is reserved and pinned
    /// at 1.0.
    fn quality_score(teams: &[Vec<&QueueEntry>], mmr_variance: i32) -> f64 {
        let team_means: Vec<f64> = teams
            .iter()
            .map(|team| {
                let players: f64 = team.iter().map(|e| e.party_size as f64).sum();
                if players == 0.0 {
                    return 0.0;
                }
                team.iter()
                    .map(|e| e.avg_mmr as f64 * e.party_size as f64)
                    .sum::<f64>()
                    / players
            })
            .collect();

        let balance = if team_means.len() >= 2 {
            let max = team_means.iter().cloned().fold(f64::MIN, f64::max);
            let min = team_means.iter().cloned().fold(f64::MAX, f64::min);
            1.0 - (max - min).min(BALANCE_NORM) / BALANCE_NORM
        } else {
            1.0
        };

        let variance_score = 1.0 - (mmr_variance as f64).min(VARIANCE_NORM) / VARIANCE_NORM;
        let wait_score = 1.0;

        0.5 * balance + 0.3 * variance_score + 0.2 * wait_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;
    use chrono::Duration;

    fn entry(party_id: &str, mmr: i32, party_size: usize, age_secs: i64) -> QueueEntry {
        QueueEntry {
            party_id: party_id.to_string(),
            region: "us-west".to_string(),
            mode: "ranked".to_string(),
            team_size: 5,
            party_size,
            avg_mmr: mmr,
            player_ids: (0..party_size)
                .map(|i| format!("{}_p{}", party_id, i))
                .collect(),
            enqueued_at: current_timestamp() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_basic_match_formation() {
        let entries: Vec<QueueEntry> = (0..10)
            .map(|i| entry(&format!("party{}", i), 1500 + i * 10, 1, 10 - i as i64))
            .collect();

        let draft = TeamBuilder::try_form_match(&entries, 5, 2, 200, 0.0).unwrap();

        assert_eq!(draft.teams.len(), 2);
        assert_eq!(draft.teams[0].len(), 5);
        assert_eq!(draft.teams[1].len(), 5);
        assert_eq!(draft.party_ids.len(), 10);
        assert!(draft.quality_score > 0.7);
    }

    #[test]
    fn test_insufficient_players() {
        let entries: Vec<QueueEntry> = (0..5)
            .map(|i| entry(&format!("party{}", i), 1500, 1, 0))
            .collect();

        assert!(TeamBuilder::try_form_match(&entries, 5, 2, 200, 0.0).is_none());
    }

    #[test]
    fn test_mmr_too_wide() {
        let entries = vec![entry("low", 1000, 5, 0), entry("high", 2000, 5, 0)];

        assert!(TeamBuilder::try_form_match(&entries, 5, 2, 200, 0.0).is_none());
    }

    #[test]
    fn test_tolerance_gate_admits_within_band() {
        let entries = vec![entry("low", 1400, 5, 10), entry("high", 1550, 5, 0)];

        // Range 150 exceeds a 100 band but fits a 200 band
        assert!(TeamBuilder::try_form_match(&entries, 5, 2, 100, 0.0).is_none());
        assert!(TeamBuilder::try_form_match(&entries, 5, 2, 200, 0.0).is_some());
    }

    #[test]
    fn test_party_kept_whole() {
        let mut entries = vec![entry("trio", 1500, 3, 60)];
        for i in 0..7 {
            entries.push(entry(&format!("solo{}", i), 1500, 1, 30 - i as i64));
        }

        let draft = TeamBuilder::try_form_match(&entries, 5, 2, 100, 0.0).unwrap();

        let trio_team = draft
            .teams
            .iter()
            .filter(|team| team.iter().any(|p| p.starts_with("trio")))
            .count();
        assert_eq!(trio_team, 1);

        let total: usize = draft.teams.iter().map(Vec::len).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_oversized_parties_are_infeasible() {
        // Four trios can never split into two teams of five
        let entries: Vec<QueueEntry> = (0..4)
            .map(|i| entry(&format!("trio{}", i), 1500, 3, 10 - i as i64))
            .collect();

        assert!(TeamBuilder::try_form_match(&entries, 5, 2, 500, 0.0).is_none());
    }

    #[test]
    fn test_quality_floor_rejects() {
        // Max spread within a 500 band: stddev 250, team gap 500 once split
        let entries = vec![entry("low", 1250, 5, 60), entry("high", 1750, 5, 0)];

        let draft = TeamBuilder::try_form_match(&entries, 5, 2, 500, 0.0).unwrap();
        assert!(draft.quality_score < 0.6);

        assert!(TeamBuilder::try_form_match(&entries, 5, 2, 500, 0.6).is_none());
    }

    #[test]
    fn test_balanced_match_scores_high() {
        let entries: Vec<QueueEntry> = (0..10)
            .map(|i| entry(&format!("party{}", i), 1500, 1, 0))
            .collect();

        let draft = TeamBuilder::try_form_match(&entries, 5, 2, 100, 0.0).unwrap();
        assert_eq!(draft.mmr_variance, 0);
        assert!(draft.quality_score > 0.999);
    }

    #[test]
    fn test_balancing_is_deterministic() {
        let entries: Vec<QueueEntry> = (0..10)
            .map(|i| entry(&format!("party{}", i), 1500 + (i % 3) * 40, 1, 20 - i as i64))
            .collect();

        let first = TeamBuilder::try_form_match(&entries, 5, 2, 200, 0.0).unwrap();
        let second = TeamBuilder::try_form_match(&entries, 5, 2, 200, 0.0).unwrap();

        assert_eq!(first.teams, second.teams);
        assert_eq!(first.quality_score, second.quality_score);
    }

    #[test]
    fn test_weighted_variance() {
        // 5 players at 1400 and 5 at 1600: mean 1500, stddev 100
        let entries = vec![entry("low", 1400, 5, 10), entry("high", 1600, 5, 0)];

        let draft = TeamBuilder::try_form_match(&entries, 5, 2, 500, 0.0).unwrap();
        assert_eq!(draft.mmr_variance, 100);
        assert_eq!(draft.avg_mmr, 1500);
    }
}
