//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! match-foundry service, including environment variable loading and
//! validation.

use crate::config::engine::EngineConfig;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub amqp: AmqpSettings,
    pub engine: EngineConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Cadence of the periodic queue-stats log line
    pub stats_interval_seconds: u64,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Capacity of the inbound command channel feeding the engine thread
    pub command_buffer_size: usize,
}

/// AMQP connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmqpSettings {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Broker credentials
    pub username: String,
    pub password: String,
    /// Virtual host
    pub vhost: String,
    /// Queue name for inbound enqueue/dequeue events
    pub queue_name: String,
    /// Exchange name for outbound match-found events
    pub exchange_name: String,
    /// Maximum retry attempts for failed operations
    pub max_retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "match-foundry".to_string(),
            log_level: "info".to_string(),
            stats_interval_seconds: 10,
            shutdown_timeout_seconds: 30,
            command_buffer_size: 1024,
        }
    }
}

impl Default for AmqpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "/".to_string(),
            queue_name: "matchmaking.queue_events".to_string(),
            exchange_name: "matchmaking.match_events".to_string(),
            max_retry_attempts: 5,
            retry_delay_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(interval) = env::var("STATS_INTERVAL_SECONDS") {
            config.service.stats_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid STATS_INTERVAL_SECONDS value: {}", interval))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(size) = env::var("COMMAND_BUFFER_SIZE") {
            config.service.command_buffer_size = size
                .parse()
                .map_err(|_| anyhow!("Invalid COMMAND_BUFFER_SIZE value: {}", size))?;
        }

        // AMQP settings
        if let Ok(host) = env::var("AMQP_HOST") {
            config.amqp.host = host;
        }
        if let Ok(port) = env::var("AMQP_PORT") {
            config.amqp.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_PORT value: {}", port))?;
        }
        if let Ok(username) = env::var("AMQP_USERNAME") {
            config.amqp.username = username;
        }
        if let Ok(password) = env::var("AMQP_PASSWORD") {
            config.amqp.password = password;
        }
        if let Ok(vhost) = env::var("AMQP_VHOST") {
            config.amqp.vhost = vhost;
        }
        if let Ok(queue) = env::var("AMQP_QUEUE_NAME") {
            config.amqp.queue_name = queue;
        }
        if let Ok(exchange) = env::var("AMQP_EXCHANGE_NAME") {
            config.amqp.exchange_name = exchange;
        }
        if let Ok(retries) = env::var("AMQP_MAX_RETRY_ATTEMPTS") {
            config.amqp.max_retry_attempts = retries
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_MAX_RETRY_ATTEMPTS value: {}", retries))?;
        }
        if let Ok(delay) = env::var("AMQP_RETRY_DELAY_MS") {
            config.amqp.retry_delay_ms = delay
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_RETRY_DELAY_MS value: {}", delay))?;
        }

        // Engine settings
        if let Ok(band) = env::var("MMR_BAND_INITIAL") {
            config.engine.band_initial = band
                .parse()
                .map_err(|_| anyhow!("Invalid MMR_BAND_INITIAL value: {}", band))?;
        }
        if let Ok(band) = env::var("MMR_BAND_MAX") {
            config.engine.band_max = band
                .parse()
                .map_err(|_| anyhow!("Invalid MMR_BAND_MAX value: {}", band))?;
        }
        if let Ok(growth) = env::var("MMR_BAND_GROWTH_PER_SEC") {
            config.engine.band_growth_per_sec = growth
                .parse()
                .map_err(|_| anyhow!("Invalid MMR_BAND_GROWTH_PER_SEC value: {}", growth))?;
        }
        if let Ok(wait) = env::var("MAX_WAIT_TIME_SECONDS") {
            config.engine.max_wait_time_secs = wait
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_WAIT_TIME_SECONDS value: {}", wait))?;
        }
        if let Ok(quality) = env::var("MIN_MATCH_QUALITY") {
            config.engine.min_match_quality = quality
                .parse()
                .map_err(|_| anyhow!("Invalid MIN_MATCH_QUALITY value: {}", quality))?;
        }
        if let Ok(interval) = env::var("TICK_INTERVAL_MS") {
            config.engine.tick_interval_ms = interval
                .parse()
                .map_err(|_| anyhow!("Invalid TICK_INTERVAL_MS value: {}", interval))?;
        }
        if let Ok(teams) = env::var("NUM_TEAMS") {
            config.engine.num_teams = teams
                .parse()
                .map_err(|_| anyhow!("Invalid NUM_TEAMS value: {}", teams))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get stats logging cadence as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.service.stats_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.stats_interval_seconds == 0 {
        return Err(anyhow!("Stats interval must be greater than 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.command_buffer_size == 0 {
        return Err(anyhow!("Command buffer size must be greater than 0"));
    }

    // Validate AMQP settings
    if config.amqp.host.is_empty() {
        return Err(anyhow!("AMQP host cannot be empty"));
    }
    if config.amqp.queue_name.is_empty() {
        return Err(anyhow!("AMQP queue name cannot be empty"));
    }
    if config.amqp.exchange_name.is_empty() {
        return Err(anyhow!("AMQP exchange name cannot be empty"));
    }

    // Engine settings carry their own validation
    config.engine.validate()?;

    Ok(())
}
