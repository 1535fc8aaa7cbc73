//! Engine tuning parameters
//!
//! These options are bound at engine construction and immutable thereafter.
//! Skill tolerance grows linearly with wait time from `band_initial` up to
//! `band_max`; entries older than `max_wait_time_secs` are evicted at tick
//! boundaries.

use crate::error::{MatchmakingError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Matchmaking engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// MMR tolerance at wait time zero
    pub band_initial: i32,
    /// Cap on MMR tolerance regardless of wait
    pub band_max: i32,
    /// Linear tolerance growth per second of wait
    pub band_growth_per_sec: i32,
    /// Age beyond which an entry is silently evicted
    pub max_wait_time_secs: u64,
    /// Lower bound on quality for a match to be emitted
    pub min_match_quality: f64,
    /// Cadence the driver is expected to honor
    pub tick_interval_ms: u64,
    /// Teams per match; only 2 is exercised
    pub num_teams: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            band_initial: 100,
            band_max: 500,
            band_growth_per_sec: 10,
            max_wait_time_secs: 120,
            min_match_quality: 0.6,
            tick_interval_ms: 200,
            num_teams: 2,
        }
    }
}

impl EngineConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.band_initial < 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "band_initial must be non-negative".to_string(),
            }
            .into());
        }
        if self.band_max < self.band_initial {
            return Err(MatchmakingError::ConfigurationError {
                message: "band_max must be at least band_initial".to_string(),
            }
            .into());
        }
        if self.band_growth_per_sec < 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "band_growth_per_sec must be non-negative".to_string(),
            }
            .into());
        }
        if self.max_wait_time_secs == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "max_wait_time_secs must be greater than 0".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.min_match_quality) {
            return Err(MatchmakingError::ConfigurationError {
                message: "min_match_quality must be within [0, 1]".to_string(),
            }
            .into());
        }
        if self.tick_interval_ms == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "tick_interval_ms must be greater than 0".to_string(),
            }
            .into());
        }
        if self.num_teams < 2 {
            return Err(MatchmakingError::ConfigurationError {
                message: "num_teams must be at least 2".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Tick cadence as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Eviction threshold as a chrono Duration
    pub fn max_wait_time(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_wait_time_secs as i64)
    }
}
