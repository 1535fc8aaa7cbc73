//! The engine driver task
//!
//! Exactly one task owns the [`MatchmakingEngine`]. It multiplexes the tick
//! interval, the inbound command channel, and the periodic stats log with
//! `select!`, so every engine operation runs on this task and the engine
//! needs no locks. Formed matches are handed to the outbound publisher.

use crate::amqp::handlers::EngineCommand;
use crate::amqp::publisher::MatchPublisher;
use crate::matchmaking::MatchmakingEngine;
use crate::metrics::MetricsCollector;
use crate::types::MatchFound;
use crate::utils::current_timestamp;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Receiver half of the shutdown broadcast
pub type ShutdownSignal = watch::Receiver<bool>;

/// Owns the engine and runs the tick loop
pub struct EngineDriver {
    engine: MatchmakingEngine,
    commands: mpsc::Receiver<EngineCommand>,
    publisher: Arc<dyn MatchPublisher>,
    metrics: Arc<MetricsCollector>,
    stats_interval: std::time::Duration,
    shutdown: ShutdownSignal,
}

impl EngineDriver {
    pub fn new(
        engine: MatchmakingEngine,
        commands: mpsc::Receiver<EngineCommand>,
        publisher: Arc<dyn MatchPublisher>,
        metrics: Arc<MetricsCollector>,
        stats_interval: std::time::Duration,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            engine,
            commands,
            publisher,
            metrics,
            stats_interval,
            shutdown,
        }
    }

    /// Run until the shutdown signal fires or the command channel closes.
    ///
    /// The in-flight tick always completes before the loop exits.
    pub async fn run(mut self) {
        let tick_every = self.engine.config().tick_interval();
        let mut ticker = interval(tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut stats_ticker = interval(self.stats_interval);
        stats_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Engine driver running - tick interval: {:?}, stats interval: {:?}",
            tick_every, self.stats_interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_tick(tick_every).await;
                }
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.apply(command),
                        None => {
                            warn!("Command channel closed, stopping engine driver");
                            break;
                        }
                    }
                }
                _ = stats_ticker.tick() => {
                    self.log_stats();
                }
                changed = self.shutdown.changed() => {
                    // A dropped sender counts as shutdown
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Shutdown signal received, stopping engine driver");
                        break;
                    }
                }
            }
        }

        let stats = self.engine.stats();
        info!(
            "Engine driver stopped - matches_formed: {}, parties_matched: {}, still_queued: {}",
            stats.matches_formed,
            stats.parties_matched,
            self.engine.queue_size()
        );
    }

    /// Apply one inbound command to the engine
    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Enqueue(entry) => {
                let party_id = entry.party_id.clone();
                match self.engine.enqueue(entry) {
                    Ok(()) => {
                        self.metrics.parties_enqueued_total.inc();
                        debug!("Enqueued party '{}'", party_id);
                    }
                    Err(e) => {
                        self.metrics.record_enqueue_reject("invalid_or_duplicate");
                        warn!("Rejected enqueue for party '{}': {}", party_id, e);
                    }
                }
            }
            EngineCommand::Dequeue(party_id) => {
                if self.engine.dequeue(&party_id).is_some() {
                    self.metrics.parties_dequeued_total.inc();
                }
            }
        }
    }

    /// Run one engine tick and publish what it produced
    async fn run_tick(&mut self, budget: std::time::Duration) {
        let started = Instant::now();
        let matches = self.engine.tick();
        let elapsed = started.elapsed();

        for result in matches {
            self.metrics
                .record_match(result.party_ids.len(), result.quality_score);

            let event = MatchFound::new(result, current_timestamp());
            if let Err(e) = self.publisher.publish_match_found(event).await {
                // The match is already committed; parties are gone from the
                // queue either way. Surface the delivery failure loudly.
                error!("Failed to publish match-found event: {}", e);
            }
        }

        self.metrics.record_tick(elapsed, self.engine.queue_size());
        self.metrics.sync_timeouts(&self.engine.stats());

        if elapsed > budget {
            warn!(
                "Tick took longer than {:?}: {:?}",
                budget, elapsed
            );
        }
    }

    /// Periodic queue stats, mirroring the bucket layout at debug level
    fn log_stats(&self) {
        let stats = self.engine.stats();
        let sizes = self.engine.bucket_sizes();

        info!(
            "Stats: total_queued={}, total_matches={}, buckets={}",
            self.engine.queue_size(),
            stats.matches_formed,
            sizes.len()
        );

        for (bucket, size) in &sizes {
            debug!("  Bucket {}: {} parties", bucket, size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::publisher::MockMatchPublisher;
    use crate::config::EngineConfig;
    use crate::types::QueueEntry;
    use std::time::Duration;

    fn solo_entry(party_id: &str, mmr: i32) -> QueueEntry {
        QueueEntry {
            party_id: party_id.to_string(),
            region: "us-west".to_string(),
            mode: "ranked".to_string(),
            team_size: 5,
            party_size: 1,
            avg_mmr: mmr,
            player_ids: vec![format!("{}_p0", party_id)],
            enqueued_at: current_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_driver_forms_and_publishes_matches() {
        let config = EngineConfig {
            tick_interval_ms: 10,
            ..EngineConfig::default()
        };
        let engine = MatchmakingEngine::new(config).unwrap();
        let publisher = Arc::new(MockMatchPublisher::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let (command_tx, command_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = EngineDriver::new(
            engine,
            command_rx,
            publisher.clone(),
            metrics.clone(),
            Duration::from_secs(60),
            shutdown_rx,
        );
        let handle = tokio::spawn(driver.run());

        for i in 0..10 {
            command_tx
                .send(EngineCommand::Enqueue(solo_entry(
                    &format!("party{}", i),
                    1500 + i * 10,
                )))
                .await
                .unwrap();
        }

        // Wait for a tick to pick the parties up and publish the match
        let deadline = Instant::now() + Duration::from_secs(2);
        while publisher.match_count() == 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(publisher.match_count(), 1);
        let event = &publisher.published_matches()[0];
        assert_eq!(event.result.teams.len(), 2);
        assert_eq!(metrics.matches_formed_total.get(), 1);
    }

    #[tokio::test]
    async fn test_driver_rejects_duplicates_without_stopping() {
        let engine = MatchmakingEngine::new(EngineConfig {
            tick_interval_ms: 10,
            ..EngineConfig::default()
        })
        .unwrap();
        let publisher = Arc::new(MockMatchPublisher::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let (command_tx, command_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = EngineDriver::new(
            engine,
            command_rx,
            publisher,
            metrics.clone(),
            Duration::from_secs(60),
            shutdown_rx,
        );
        let handle = tokio::spawn(driver.run());

        command_tx
            .send(EngineCommand::Enqueue(solo_entry("party1", 1500)))
            .await
            .unwrap();
        command_tx
            .send(EngineCommand::Enqueue(solo_entry("party1", 1500)))
            .await
            .unwrap();
        command_tx
            .send(EngineCommand::Dequeue("party1".to_string()))
            .await
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while metrics.parties_dequeued_total.get() == 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(metrics.parties_enqueued_total.get(), 1);
        assert_eq!(metrics.parties_dequeued_total.get(), 1);
        assert_eq!(
            metrics
                .enqueue_rejects_total
                .with_label_values(&["invalid_or_duplicate"])
                .get(),
            1
        );
    }
}
