//! Match Foundry - Matchmaking engine core for multiplayer game services
//!
//! This crate consumes party enqueue/dequeue events over AMQP, holds parties
//! in an in-memory queue partitioned by `(region, mode, team_size)`, and on
//! a fixed tick emits balanced matches drawn from those parties.

pub mod amqp;
pub mod clock;
pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use amqp::publisher::MatchPublisher;
pub use config::{AppConfig, EngineConfig};
pub use matchmaking::{BucketIndex, MatchmakingEngine, TeamBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
