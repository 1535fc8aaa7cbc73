//! AMQP publisher for outbound match-found events

use crate::amqp::messages::{MessageEnvelope, MATCH_FOUND_ROUTING_KEY};
use crate::error::{MatchmakingError, Result};
use crate::types::MatchFound;
use amqprs::{
    channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments},
    BasicProperties,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Trait for publishing formed matches to the outside world.
///
/// This is the engine core's only outbound seam; production wires it to
/// AMQP, tests record the events in memory.
#[async_trait]
pub trait MatchPublisher: Send + Sync {
    /// Publish a match-found event
    async fn publish_match_found(&self, event: MatchFound) -> Result<()>;
}

/// Configuration for event publishing
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub exchange_name: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            exchange_name: crate::amqp::messages::MATCH_EVENTS_EXCHANGE.to_string(),
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// AMQP-based match publisher implementation
pub struct AmqpMatchPublisher {
    channel: Channel,
    config: PublisherConfig,
}

impl AmqpMatchPublisher {
    /// Create a new publisher, declaring the match events exchange
    pub async fn new(channel: Channel, config: PublisherConfig) -> Result<Self> {
        let publisher = Self { channel, config };
        publisher.setup_exchange().await?;
        Ok(publisher)
    }

    async fn setup_exchange(&self) -> Result<()> {
        let args = ExchangeDeclareArguments::new(&self.config.exchange_name, "topic");
        self.channel.exchange_declare(args).await.map_err(|e| {
            MatchmakingError::AmqpConnectionFailed {
                message: format!("Failed to declare match events exchange: {}", e),
            }
        })?;

        debug!(
            "Declared match events exchange '{}'",
            self.config.exchange_name
        );
        Ok(())
    }

    /// Publish an envelope with bounded retry and exponential backoff
    async fn publish_with_retry<T>(&self, envelope: &MessageEnvelope<T>) -> Result<()>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);
        let attempts = self.config.max_retries.max(1);

        for attempt in 1..=attempts {
            match self.try_publish(envelope).await {
                Ok(()) => {
                    debug!(
                        "Published message {} to exchange {}",
                        envelope.event_id, self.config.exchange_name
                    );
                    return Ok(());
                }
                Err(e) if attempt == attempts => {
                    error!(
                        "Failed to publish message {} after {} attempts: {}",
                        envelope.event_id, attempts, e
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Publish attempt {} failed for message {}: {}. Retrying in {:?}",
                        attempt, envelope.event_id, e, delay
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(5));
                }
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }

    /// Single publish attempt
    async fn try_publish<T>(&self, envelope: &MessageEnvelope<T>) -> Result<()>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let payload = envelope.to_bytes()?;

        let args = BasicPublishArguments::new(&self.config.exchange_name, &envelope.routing_key);
        let mut properties = BasicProperties::default();
        properties
            .with_message_id(&envelope.event_id)
            .with_timestamp(envelope.published_at.timestamp() as u64)
            .with_content_type("application/json");

        self.channel
            .basic_publish(properties, payload, args)
            .await
            .map_err(|e| MatchmakingError::AmqpConnectionFailed {
                message: format!("Failed to publish message: {}", e),
            })?;

        Ok(())
    }
}

#[async_trait]
impl MatchPublisher for AmqpMatchPublisher {
    async fn publish_match_found(&self, event: MatchFound) -> Result<()> {
        let envelope = MessageEnvelope::new(event, MATCH_FOUND_ROUTING_KEY.to_string());
        self.publish_with_retry(&envelope).await
    }
}

/// Mock match publisher for testing
#[derive(Debug, Default)]
pub struct MockMatchPublisher {
    published: std::sync::Mutex<Vec<MatchFound>>,
}

impl MockMatchPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All match-found events published so far
    pub fn published_matches(&self) -> Vec<MatchFound> {
        self.published
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events published
    pub fn match_count(&self) -> usize {
        self.published.lock().map(|events| events.len()).unwrap_or(0)
    }

    /// Drop recorded events
    pub fn clear(&self) {
        if let Ok(mut events) = self.published.lock() {
            events.clear();
        }
    }
}

#[async_trait]
impl MatchPublisher for MockMatchPublisher {
    async fn publish_match_found(&self, event: MatchFound) -> Result<()> {
        if let Ok(mut events) = self.published.lock() {
            events.push(event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchResult;
    use crate::utils::{current_timestamp, generate_match_id};

    fn create_test_match_found() -> MatchFound {
        MatchFound::new(
            MatchResult {
                match_id: generate_match_id(),
                region: "us-west".to_string(),
                mode: "ranked".to_string(),
                team_size: 5,
                teams: vec![vec!["p0".to_string()], vec!["p1".to_string()]],
                party_ids: vec!["party0".to_string(), "party1".to_string()],
                avg_mmr: 1500,
                mmr_variance: 25,
                quality_score: 0.92,
            },
            current_timestamp(),
        )
    }

    #[test]
    fn test_publisher_config_default() {
        let config = PublisherConfig::default();
        assert_eq!(config.exchange_name, "matchmaking.match_events");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 500);
    }

    #[tokio::test]
    async fn test_mock_publisher_records_events() {
        let publisher = MockMatchPublisher::new();
        publisher
            .publish_match_found(create_test_match_found())
            .await
            .unwrap();

        assert_eq!(publisher.match_count(), 1);
        assert_eq!(publisher.published_matches()[0].result.avg_mmr, 1500);

        publisher.clear();
        assert_eq!(publisher.match_count(), 0);
    }

    #[test]
    fn test_match_found_envelope_roundtrip() {
        let event = create_test_match_found();
        let envelope = MessageEnvelope::new(event, MATCH_FOUND_ROUTING_KEY.to_string());

        let bytes = envelope.to_bytes().unwrap();
        let decoded: MessageEnvelope<MatchFound> = MessageEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.routing_key, MATCH_FOUND_ROUTING_KEY);
        assert_eq!(decoded.payload.result.party_ids.len(), 2);
    }
}
