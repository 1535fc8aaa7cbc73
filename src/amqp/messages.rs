//! AMQP message definitions and serialization

use crate::error::{MatchmakingError, Result};
use crate::types::*;

/// Queue carrying inbound enqueue/dequeue events
pub const QUEUE_EVENTS_QUEUE: &str = "matchmaking.queue_events";
/// Exchange for outbound match events
pub const MATCH_EVENTS_EXCHANGE: &str = "matchmaking.match_events";

/// Routing key for match-found events
pub const MATCH_FOUND_ROUTING_KEY: &str = "match.found";

/// Message envelope with delivery metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageEnvelope<T> {
    pub payload: T,
    /// Fresh id stamped per publish, carried as the AMQP message id
    pub event_id: String,
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub routing_key: String,
}

impl<T> MessageEnvelope<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Wrap a payload for publishing under `routing_key`
    pub fn new(payload: T, routing_key: String) -> Self {
        Self {
            payload,
            event_id: uuid::Uuid::new_v4().to_string(),
            published_at: chrono::Utc::now(),
            routing_key,
        }
    }

    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            MatchmakingError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            MatchmakingError::InvalidEntry {
                reason: format!("Failed to deserialize message: {}", e),
            }
            .into()
        })
    }
}

/// Message serialization and validation utilities
pub struct MessageUtils;

impl MessageUtils {
    /// Deserialize a queue event from bytes, validating enqueue payloads
    pub fn deserialize_queue_event(bytes: &[u8]) -> Result<QueueEvent> {
        let event: QueueEvent =
            serde_json::from_slice(bytes).map_err(|e| MatchmakingError::InvalidEntry {
                reason: format!("Failed to deserialize queue event: {}", e),
            })?;

        match &event {
            QueueEvent::Enqueue(request) => Self::validate_enqueue_request(request)?,
            QueueEvent::Dequeue(request) => {
                if request.party_id.is_empty() {
                    return Err(MatchmakingError::InvalidEntry {
                        reason: "Party ID cannot be empty".to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(event)
    }

    /// Validate an enqueue request at the transport edge.
    ///
    /// The engine re-validates on `enqueue`; rejecting garbage here keeps it
    /// out of the command channel entirely.
    pub fn validate_enqueue_request(request: &EnqueueRequest) -> Result<()> {
        if request.party_id.is_empty() {
            return Err(MatchmakingError::InvalidEntry {
                reason: "Party ID cannot be empty".to_string(),
            }
            .into());
        }

        if request.region.is_empty() || request.mode.is_empty() {
            return Err(MatchmakingError::InvalidEntry {
                reason: "Region and mode cannot be empty".to_string(),
            }
            .into());
        }

        if request.team_size == 0 {
            return Err(MatchmakingError::InvalidEntry {
                reason: "Team size must be at least 1".to_string(),
            }
            .into());
        }

        if request.party_size == 0 || request.party_size > request.team_size {
            return Err(MatchmakingError::InvalidEntry {
                reason: format!(
                    "Party size {} must be within [1, {}]",
                    request.party_size, request.team_size
                ),
            }
            .into());
        }

        if request.player_ids.len() != request.party_size {
            return Err(MatchmakingError::InvalidEntry {
                reason: format!(
                    "Expected {} player ids, got {}",
                    request.party_size,
                    request.player_ids.len()
                ),
            }
            .into());
        }

        Ok(())
    }

    /// Serialize any AMQP message to bytes
    pub fn serialize_message<T: serde::Serialize>(message: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(message).map_err(|e| {
            MatchmakingError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }
}
