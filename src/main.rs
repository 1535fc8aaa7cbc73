//! Main entry point for the Match Foundry matchmaking service
//!
//! Wires the AMQP transport to the single-owner engine driver: inbound
//! queue events flow over a channel into the driver task, formed matches
//! flow back out through the publisher.

use anyhow::Result;
use clap::Parser;
use match_foundry::amqp::connection::AmqpConnection;
use match_foundry::amqp::handlers::QueueEventConsumer;
use match_foundry::amqp::publisher::{AmqpMatchPublisher, PublisherConfig};
use match_foundry::config::AppConfig;
use match_foundry::matchmaking::MatchmakingEngine;
use match_foundry::metrics::MetricsCollector;
use match_foundry::service::EngineDriver;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Match Foundry - matchmaking engine for multiplayer game services
#[derive(Parser)]
#[command(
    name = "match-foundry",
    version,
    about = "A soft-realtime matchmaking engine forming balanced teams from queued parties",
    long_about = "Match Foundry consumes party enqueue/dequeue events over AMQP, buckets \
                  parties by region, mode and team size, and on a fixed tick emits balanced \
                  matches whose skill spread widens with queue wait time."
)]
struct Args {
    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// AMQP host override
    #[arg(long, value_name = "HOST", help = "Override AMQP broker host")]
    amqp_host: Option<String>,

    /// AMQP port override
    #[arg(long, value_name = "PORT", help = "Override AMQP broker port")]
    amqp_port: Option<u16>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Match Foundry Matchmaking Engine");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   AMQP: {}:{}", config.amqp.host, config.amqp.port);
    info!("   Tick interval: {}ms", config.engine.tick_interval_ms);
    info!(
        "   MMR band: {}..{} (+{}/s)",
        config.engine.band_initial, config.engine.band_max, config.engine.band_growth_per_sec
    );
    info!("   Max wait: {}s", config.engine.max_wait_time_secs);
    info!("   Min quality: {}", config.engine.min_match_quality);
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()?;

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(host) = &args.amqp_host {
        config.amqp.host = host.clone();
    }

    if let Some(port) = args.amqp_port {
        config.amqp.port = port;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    // Connect to the broker and open channels for both directions
    info!("Connecting to AMQP broker...");
    let connection = AmqpConnection::connect(&config.amqp).await?;
    let consumer_channel = connection.open_channel().await?;
    let publisher_channel = connection.open_channel().await?;

    let publisher = Arc::new(
        AmqpMatchPublisher::new(
            publisher_channel,
            PublisherConfig {
                exchange_name: config.amqp.exchange_name.clone(),
                max_retries: config.amqp.max_retry_attempts,
                retry_delay_ms: config.amqp.retry_delay_ms,
            },
        )
        .await?,
    );

    let metrics = Arc::new(MetricsCollector::new()?);
    let engine = MatchmakingEngine::new(config.engine.clone())?;

    // Inbound events are handed to the engine's owning task over this channel
    let (command_tx, command_rx) = mpsc::channel(config.service.command_buffer_size);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer = QueueEventConsumer::new(command_tx, consumer_channel);
    consumer.start_consuming(&config.amqp.queue_name).await?;

    let driver = EngineDriver::new(
        engine,
        command_rx,
        publisher,
        metrics,
        config.stats_interval(),
        shutdown_rx,
    );
    let driver_handle = tokio::spawn(driver.run());

    info!("Match Foundry is running. Press Ctrl+C to shutdown gracefully...");
    wait_for_shutdown_signal().await;

    info!("Shutdown signal received, beginning graceful shutdown...");

    if let Err(e) = consumer.stop_consuming().await {
        warn!("Failed to cancel AMQP consumer: {}", e);
    }
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(config.shutdown_timeout(), driver_handle).await {
        Ok(Ok(())) => info!("Engine driver stopped cleanly"),
        Ok(Err(e)) => error!("Engine driver task failed: {}", e),
        Err(_) => warn!("Shutdown timeout exceeded, forcing exit"),
    }

    if let Err(e) = connection.close().await {
        warn!("Failed to close AMQP connection: {}", e);
    }

    info!("Match Foundry stopped");
    Ok(())
}
