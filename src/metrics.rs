//! Metrics collection using Prometheus
//!
//! Counters and histograms covering queue traffic, match output, and tick
//! latency. The driver records into this collector; scraping/exposition is
//! left to the deployment.

use crate::matchmaking::EngineStats;
use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector for the matchmaking engine
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    /// Parties accepted into the queue
    pub parties_enqueued_total: IntCounter,
    /// Enqueue commands rejected, labeled by reason
    pub enqueue_rejects_total: IntCounterVec,
    /// Parties removed by explicit dequeue
    pub parties_dequeued_total: IntCounter,
    /// Matches emitted
    pub matches_formed_total: IntCounter,
    /// Parties committed into matches
    pub parties_matched_total: IntCounter,
    /// Parties silently evicted on timeout
    pub parties_timed_out_total: IntCounter,
    /// Parties currently waiting across all buckets
    pub queue_depth: IntGauge,
    /// Wall time of each engine tick
    pub tick_duration_seconds: Histogram,
    /// Quality score distribution of emitted matches
    pub match_quality: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Create a new metrics collector registering into `registry`
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let parties_enqueued_total = IntCounter::with_opts(Opts::new(
            "matchmaking_parties_enqueued_total",
            "Total parties accepted into the queue",
        ))?;
        let enqueue_rejects_total = IntCounterVec::new(
            Opts::new(
                "matchmaking_enqueue_rejects_total",
                "Enqueue commands rejected, by reason",
            ),
            &["reason"],
        )?;
        let parties_dequeued_total = IntCounter::with_opts(Opts::new(
            "matchmaking_parties_dequeued_total",
            "Total parties removed by explicit dequeue",
        ))?;
        let matches_formed_total = IntCounter::with_opts(Opts::new(
            "matchmaking_matches_formed_total",
            "Total matches emitted",
        ))?;
        let parties_matched_total = IntCounter::with_opts(Opts::new(
            "matchmaking_parties_matched_total",
            "Total parties committed into matches",
        ))?;
        let parties_timed_out_total = IntCounter::with_opts(Opts::new(
            "matchmaking_parties_timed_out_total",
            "Total parties evicted after exceeding the wait cap",
        ))?;
        let queue_depth = IntGauge::with_opts(Opts::new(
            "matchmaking_queue_depth",
            "Parties currently waiting across all buckets",
        ))?;
        let tick_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "matchmaking_tick_duration_seconds",
                "Wall time of each engine tick",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5,
            ]),
        )?;
        let match_quality = Histogram::with_opts(
            HistogramOpts::new(
                "matchmaking_match_quality",
                "Quality score distribution of emitted matches",
            )
            .buckets(vec![0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 1.0]),
        )?;

        registry.register(Box::new(parties_enqueued_total.clone()))?;
        registry.register(Box::new(enqueue_rejects_total.clone()))?;
        registry.register(Box::new(parties_dequeued_total.clone()))?;
        registry.register(Box::new(matches_formed_total.clone()))?;
        registry.register(Box::new(parties_matched_total.clone()))?;
        registry.register(Box::new(parties_timed_out_total.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(tick_duration_seconds.clone()))?;
        registry.register(Box::new(match_quality.clone()))?;

        Ok(Self {
            registry,
            parties_enqueued_total,
            enqueue_rejects_total,
            parties_dequeued_total,
            matches_formed_total,
            parties_matched_total,
            parties_timed_out_total,
            queue_depth,
            tick_duration_seconds,
            match_quality,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record a completed tick
    pub fn record_tick(&self, duration: Duration, queue_depth: usize) {
        self.tick_duration_seconds.observe(duration.as_secs_f64());
        self.queue_depth.set(queue_depth as i64);
    }

    /// Record an emitted match
    pub fn record_match(&self, party_count: usize, quality_score: f64) {
        self.matches_formed_total.inc();
        self.parties_matched_total.inc_by(party_count as u64);
        self.match_quality.observe(quality_score);
    }

    /// Record a rejected enqueue command
    pub fn record_enqueue_reject(&self, reason: &str) {
        self.enqueue_rejects_total.with_label_values(&[reason]).inc();
    }

    /// Reconcile eviction counters against an engine stats snapshot.
    ///
    /// Timeouts happen inside `tick`, so the driver syncs the lifetime total
    /// rather than observing each eviction.
    pub fn sync_timeouts(&self, stats: &EngineStats) {
        let current = self.parties_timed_out_total.get();
        if stats.parties_timed_out > current {
            self.parties_timed_out_total
                .inc_by(stats.parties_timed_out - current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_registers_metrics() {
        let collector = MetricsCollector::new().unwrap();
        collector.parties_enqueued_total.inc();
        collector.record_match(2, 0.85);
        collector.record_tick(Duration::from_millis(3), 14);

        let families = collector.registry().gather();
        assert!(!families.is_empty());

        let names: Vec<String> = families
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect();
        assert!(names
            .iter()
            .any(|name| name == "matchmaking_matches_formed_total"));
        assert!(names
            .iter()
            .any(|name| name == "matchmaking_tick_duration_seconds"));
    }

    #[test]
    fn test_sync_timeouts_is_monotonic() {
        let collector = MetricsCollector::new().unwrap();
        let stats = EngineStats {
            parties_timed_out: 5,
            ..EngineStats::default()
        };

        collector.sync_timeouts(&stats);
        assert_eq!(collector.parties_timed_out_total.get(), 5);

        // Re-syncing the same snapshot does not double count
        collector.sync_timeouts(&stats);
        assert_eq!(collector.parties_timed_out_total.get(), 5);
    }
}
