//! The matchmaking engine: public surface of the core
//!
//! The engine is single-owner: one driver thread calls `enqueue`, `dequeue`,
//! and `tick`; there are no locks and no shared mutable state inside.
//! Inbound transports running elsewhere must hand work over through a
//! channel owned by the driver.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{MatchmakingError, Result};
use crate::matchmaking::bucket::BucketIndex;
use crate::matchmaking::team_builder::{MatchDraft, TeamBuilder};
use crate::types::{BucketKey, MatchResult, PartyId, QueueEntry};
use crate::utils::{generate_match_id, wait_seconds};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifetime counters for engine activity
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// Total parties accepted by `enqueue`
    pub parties_enqueued: u64,
    /// Total parties removed by explicit `dequeue`
    pub parties_dequeued: u64,
    /// Total matches emitted
    pub matches_formed: u64,
    /// Total parties committed into matches
    pub parties_matched: u64,
    /// Total parties silently evicted on timeout
    pub parties_timed_out: u64,
}

/// The matchmaking engine
pub struct MatchmakingEngine {
    config: EngineConfig,
    index: BucketIndex,
    clock: Arc<dyn Clock>,
    stats: EngineStats,
}

impl MatchmakingEngine {
    /// Create an engine on the system clock
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an engine with an injected clock source
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            index: BucketIndex::new(),
            clock,
            stats: EngineStats::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and insert a party into the queue.
    ///
    /// Fails with `InvalidEntry` on structural violations and
    /// `DuplicateParty` if the party is already live; neither mutates state.
    pub fn enqueue(&mut self, entry: QueueEntry) -> Result<()> {
        Self::validate_entry(&entry)?;
        self.index.insert(entry)?;
        self.stats.parties_enqueued += 1;
        Ok(())
    }

    /// Remove a party if present. Unknown parties are a no-op.
    pub fn dequeue(&mut self, party_id: &str) -> Option<QueueEntry> {
        let removed = self.index.remove(party_id);
        if removed.is_some() {
            self.stats.parties_dequeued += 1;
            debug!("Dequeued party '{}'", party_id);
        }
        removed
    }

    /// Whether a party is currently queued
    pub fn is_queued(&self, party_id: &str) -> bool {
        self.index.contains(party_id)
    }

    /// Current skill tolerance of a queued party, computed against the
    /// clock's present reading
    pub fn tolerance_of(&self, party_id: &str) -> Option<i32> {
        let entry = self.index.get(party_id)?;
        Some(self.mmr_band(entry, self.clock.now()))
    }

    /// Advance the engine by one cycle.
    ///
    /// A single clock reading governs every age calculation in the call.
    /// Each bucket is first purged of timed-out entries, then drained of as
    /// many matches as the oldest entry's tolerance admits. Parties of every
    /// returned match have already been removed from the index.
    pub fn tick(&mut self) -> Vec<MatchResult> {
        let now = self.clock.now();
        let mut matches = Vec::new();

        for key in self.index.keys() {
            self.evict_timed_out(&key, now);

            loop {
                let view = self.index.bucket_view(&key);
                if view.len() < self.config.num_teams {
                    break;
                }

                // Fairness anchor: the tolerance of the bucket's oldest
                // party bounds the whole candidate set.
                let tolerance = self.mmr_band(&view[0], now);
                let Some(draft) = TeamBuilder::try_form_match(
                    view,
                    key.team_size,
                    self.config.num_teams,
                    tolerance,
                    self.config.min_match_quality,
                ) else {
                    break;
                };

                let result = self.commit(&key, draft);
                self.index.remove_many(&result.party_ids);
                self.stats.matches_formed += 1;
                self.stats.parties_matched += result.party_ids.len() as u64;

                info!(
                    "Match formed - id: {}, bucket: {}, parties: {}, avg_mmr: {}, quality: {:.2}",
                    result.match_id,
                    key,
                    result.party_ids.len(),
                    result.avg_mmr,
                    result.quality_score
                );
                matches.push(result);
            }
        }

        matches
    }

    /// Total number of queued parties
    pub fn queue_size(&self) -> usize {
        self.index.len()
    }

    /// Number of queued parties in one bucket
    pub fn queue_size_of(&self, key: &BucketKey) -> usize {
        self.index.size_of(key)
    }

    /// Depth of every non-empty bucket
    pub fn bucket_sizes(&self) -> HashMap<String, usize> {
        self.index.sizes_by_key()
    }

    /// Snapshot of the lifetime counters
    pub fn stats(&self) -> EngineStats {
        self.stats.clone()
    }

    /// Skill tolerance for an entry at `now`: linear growth from the initial
    /// band, capped at the maximum.
    fn mmr_band(&self, entry: &QueueEntry, now: DateTime<Utc>) -> i32 {
        let waited = wait_seconds(entry, now);
        let band = self.config.band_initial as i64
            + waited * self.config.band_growth_per_sec as i64;
        band.min(self.config.band_max as i64) as i32
    }

    /// Drop entries whose age exceeds the wait cap. Evicted parties are not
    /// matched and not re-queued; the drop is observable only as absence.
    fn evict_timed_out(&mut self, key: &BucketKey, now: DateTime<Utc>) {
        let max_wait = self.config.max_wait_time();
        let expired: Vec<PartyId> = self
            .index
            .bucket_view(key)
            .iter()
            .filter(|e| now - e.enqueued_at > max_wait)
            .map(|e| e.party_id.clone())
            .collect();

        if expired.is_empty() {
            return;
        }

        let removed = self.index.remove_many(&expired);
        self.stats.parties_timed_out += removed.len() as u64;
        for entry in &removed {
            debug!(
                "Evicted party '{}' from bucket {} after {}s in queue",
                entry.party_id,
                key,
                wait_seconds(entry, now)
            );
        }
        warn!(
            "Evicted {} timed-out parties from bucket {}",
            removed.len(),
            key
        );
    }

    /// Stamp identity and bucket fields onto a draft, verifying the roster
    /// invariants first. A violation here is a defect in the engine itself,
    /// so it aborts rather than emit a malformed match.
    fn commit(&self, key: &BucketKey, draft: MatchDraft) -> MatchResult {
        assert_eq!(
            draft.teams.len(),
            self.config.num_teams,
            "team count does not match engine configuration"
        );

        let mut seen_players = std::collections::HashSet::new();
        for roster in &draft.teams {
            assert_eq!(
                roster.len(),
                key.team_size,
                "team roster does not fill the bucket's team size"
            );
            for player in roster {
                assert!(
                    seen_players.insert(player.clone()),
                    "player '{}' appears in more than one roster",
                    player
                );
            }
        }

        MatchResult {
            match_id: generate_match_id(),
            region: key.region.clone(),
            mode: key.mode.clone(),
            team_size: key.team_size,
            teams: draft.teams,
            party_ids: draft.party_ids,
            avg_mmr: draft.avg_mmr,
            mmr_variance: draft.mmr_variance,
            quality_score: draft.quality_score,
        }
    }

    fn validate_entry(entry: &QueueEntry) -> Result<()> {
        if entry.party_id.is_empty() {
            return Err(invalid("party_id cannot be empty"));
        }
        if entry.region.is_empty() {
            return Err(invalid("region cannot be empty"));
        }
        if entry.mode.is_empty() {
            return Err(invalid("mode cannot be empty"));
        }
        if entry.team_size == 0 {
            return Err(invalid("team_size must be at least 1"));
        }
        if entry.party_size == 0 {
            return Err(invalid("party_size must be at least 1"));
        }
        if entry.party_size > entry.team_size {
            return Err(invalid(&format!(
                "party_size {} exceeds team_size {}",
                entry.party_size, entry.team_size
            )));
        }
        if entry.player_ids.len() != entry.party_size {
            return Err(invalid(&format!(
                "expected {} player ids, got {}",
                entry.party_size,
                entry.player_ids.len()
            )));
        }
        if entry.player_ids.iter().any(String::is_empty) {
            return Err(invalid("player ids cannot be empty"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> anyhow::Error {
    MatchmakingError::InvalidEntry {
        reason: reason.to_string(),
    }
    .into()
}
