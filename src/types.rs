//! Common types used throughout the matchmaking engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for parties
pub type PartyId = String;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for matches
pub type MatchId = Uuid;

/// One party's presence in the matchmaking queue.
///
/// A party is indivisible: all of its players land on the same team.
/// `enqueued_at` is captured at insertion and never mutated; aging is always
/// derived from it and the tick's captured clock reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub party_id: PartyId,
    pub region: String,
    pub mode: String,
    /// Players each team in the eventual match must contain
    pub team_size: usize,
    /// Players this party contributes, in `[1, team_size]`
    pub party_size: usize,
    /// Party skill rating used for matching
    pub avg_mmr: i32,
    /// Member identifiers; length equals `party_size`
    pub player_ids: Vec<PlayerId>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// The bucket this entry belongs to
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey {
            region: self.region.clone(),
            mode: self.mode.clone(),
            team_size: self.team_size,
        }
    }
}

/// Compatibility key partitioning the queue.
///
/// Two entries may only ever match if their keys are equal; this is an
/// absolute constraint and is never relaxed by aging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub region: String,
    pub mode: String,
    pub team_size: usize,
}

impl BucketKey {
    pub fn new(region: impl Into<String>, mode: impl Into<String>, team_size: usize) -> Self {
        Self {
            region: region.into(),
            mode: mode.into(),
            team_size,
        }
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.region, self.mode, self.team_size)
    }
}

/// A fully-formed match emitted by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub region: String,
    pub mode: String,
    pub team_size: usize,
    /// One roster per team; each roster holds exactly `team_size` player ids
    pub teams: Vec<Vec<PlayerId>>,
    /// Contributing parties, no duplicates, no guaranteed order
    pub party_ids: Vec<PartyId>,
    /// Player-weighted mean MMR of the contributing parties
    pub avg_mmr: i32,
    /// Player-weighted MMR standard deviation, rounded to an integer
    pub mmr_variance: i32,
    /// Deterministic match quality in `[0, 1]`
    pub quality_score: f64,
}

/// Wire-level request to enqueue a party.
///
/// `enqueued_at` is source-assigned; when absent the engine stamps its own
/// clock reading at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub party_id: PartyId,
    pub region: String,
    pub mode: String,
    pub team_size: usize,
    pub party_size: usize,
    pub avg_mmr: i32,
    pub player_ids: Vec<PlayerId>,
    #[serde(default)]
    pub enqueued_at: Option<DateTime<Utc>>,
}

impl EnqueueRequest {
    /// Convert into a queue entry, stamping `now` when the source left the
    /// enqueue timestamp unset.
    pub fn into_entry(self, now: DateTime<Utc>) -> QueueEntry {
        QueueEntry {
            party_id: self.party_id,
            region: self.region,
            mode: self.mode,
            team_size: self.team_size,
            party_size: self.party_size,
            avg_mmr: self.avg_mmr,
            player_ids: self.player_ids,
            enqueued_at: self.enqueued_at.unwrap_or(now),
        }
    }
}

/// Wire-level request to remove a party from the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DequeueRequest {
    pub party_id: PartyId,
}

/// Union type for inbound queue events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    Enqueue(EnqueueRequest),
    Dequeue(DequeueRequest),
}

/// Event emitted when a match has been formed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFound {
    #[serde(flatten)]
    pub result: MatchResult,
    pub timestamp: DateTime<Utc>,
}

impl MatchFound {
    pub fn new(result: MatchResult, timestamp: DateTime<Utc>) -> Self {
        Self { result, timestamp }
    }
}
