//! AMQP consumer for inbound queue events
//!
//! The consumer runs on the broker's callback task and never touches the
//! engine itself. Every parsed event becomes an [`EngineCommand`] handed
//! over an mpsc channel to the driver task that owns the engine; that
//! handoff is what keeps the engine single-threaded.

use crate::amqp::messages::MessageUtils;
use crate::types::{PartyId, QueueEntry, QueueEvent};
use crate::utils::current_timestamp;
use amqprs::{
    channel::{BasicCancelArguments, BasicConsumeArguments, Channel, QueueDeclareArguments},
    consumer::AsyncConsumer,
    BasicProperties, Deliver,
};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::{MatchmakingError, Result};

/// Commands applied to the engine on its owning task
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Enqueue(QueueEntry),
    Dequeue(PartyId),
}

/// Consumer wrapper handling subscription lifecycle
pub struct QueueEventConsumer {
    commands: mpsc::Sender<EngineCommand>,
    channel: Channel,
    consumer_tag: String,
}

impl QueueEventConsumer {
    /// Create a new queue event consumer
    pub fn new(commands: mpsc::Sender<EngineCommand>, channel: Channel) -> Self {
        let consumer_tag = format!("queue-consumer-{}", uuid::Uuid::new_v4());

        Self {
            commands,
            channel,
            consumer_tag,
        }
    }

    /// Declare the queue and start consuming messages from it
    pub async fn start_consuming(&self, queue_name: &str) -> Result<()> {
        let _ = self
            .channel
            .queue_declare(QueueDeclareArguments::new(queue_name))
            .await
            .map_err(|e| MatchmakingError::AmqpConnectionFailed {
                message: format!("Failed to declare queue: {}", e),
            })?;

        let args = BasicConsumeArguments::new(queue_name, &self.consumer_tag);

        self.channel
            .basic_consume(QueueEventHandler::new(self.commands.clone()), args)
            .await
            .map_err(|e| MatchmakingError::AmqpConnectionFailed {
                message: format!("Failed to start consuming: {}", e),
            })?;

        info!("Started consuming queue events from: {}", queue_name);
        Ok(())
    }

    /// Stop consuming messages
    pub async fn stop_consuming(&self) -> Result<()> {
        let args = BasicCancelArguments::new(&self.consumer_tag);

        self.channel.basic_cancel(args).await.map_err(|e| {
            MatchmakingError::AmqpConnectionFailed {
                message: format!("Failed to stop consuming: {}", e),
            }
        })?;

        info!("Stopped consuming queue events");
        Ok(())
    }
}

/// Internal consumer implementation forwarding to the engine channel
struct QueueEventHandler {
    commands: mpsc::Sender<EngineCommand>,
}

impl QueueEventHandler {
    fn new(commands: mpsc::Sender<EngineCommand>) -> Self {
        Self { commands }
    }

    /// Parse an incoming message into a command for the engine task
    fn parse_command(content: &[u8]) -> Result<EngineCommand> {
        let event = MessageUtils::deserialize_queue_event(content)?;

        Ok(match event {
            QueueEvent::Enqueue(request) => {
                // Source timestamps are honored; absent ones are stamped here
                EngineCommand::Enqueue(request.into_entry(current_timestamp()))
            }
            QueueEvent::Dequeue(request) => EngineCommand::Dequeue(request.party_id),
        })
    }
}

#[async_trait]
impl AsyncConsumer for QueueEventHandler {
    async fn consume(
        &mut self,
        _channel: &Channel,
        deliver: Deliver,
        _basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        let delivery_tag = deliver.delivery_tag();

        match Self::parse_command(&content) {
            Ok(command) => {
                if let Err(e) = self.commands.send(command).await {
                    error!(
                        "Engine command channel closed, dropping message - delivery_tag: {}, error: {}",
                        delivery_tag, e
                    );
                }
            }
            Err(e) => {
                warn!(
                    "Discarding malformed queue event - delivery_tag: {}, size: {} bytes, error: {}",
                    delivery_tag,
                    content.len(),
                    e
                );

                // Log a short preview for debugging (safely)
                if !content.is_empty() {
                    let preview_len = std::cmp::min(100, content.len());
                    let preview = String::from_utf8_lossy(&content[..preview_len]);
                    warn!("Message preview: {:?}", preview);
                }
            }
        }
    }
}
