//! Matchmaking core: bucketed queue, team formation, and the tick engine
//!
//! The queue is partitioned by `(region, mode, team_size)`; matches are only
//! ever formed within one bucket. A fixed-cadence tick drives timeout
//! eviction and team formation, anchored on each bucket's oldest entry.

pub mod bucket;
pub mod engine;
pub mod team_builder;

// Re-export commonly used types
pub use bucket::BucketIndex;
pub use engine::{EngineStats, MatchmakingEngine};
pub use team_builder::{MatchDraft, TeamBuilder};
