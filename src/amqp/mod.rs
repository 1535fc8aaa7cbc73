//! AMQP integration for the matchmaking engine
//!
//! This module handles the broker connection, inbound queue-event
//! consumption, and outbound match-found publishing. Consumers never touch
//! the engine directly: they forward commands over a channel to the single
//! driver task that owns it.

pub mod connection;
pub mod handlers;
pub mod messages;
pub mod publisher;

// Re-export commonly used types
pub use connection::AmqpConnection;
pub use handlers::{EngineCommand, QueueEventConsumer};
pub use messages::*;
pub use publisher::MatchPublisher;
