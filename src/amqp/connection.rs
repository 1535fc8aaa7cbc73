//! AMQP connection management with retry logic

use crate::config::AmqpSettings;
use crate::error::{MatchmakingError, Result};
use amqprs::channel::Channel;
use amqprs::connection::{Connection, OpenConnectionArguments};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Broker connection handle.
///
/// Establishment retries with doubling delay up to the configured attempt
/// count; everything after that (channels, consumers, publishers) is built
/// on top of this handle.
pub struct AmqpConnection {
    connection: Connection,
}

impl AmqpConnection {
    /// Connect to the broker described by `settings`
    pub async fn connect(settings: &AmqpSettings) -> Result<Self> {
        let mut delay = Duration::from_millis(settings.retry_delay_ms);

        for attempt in 1..=settings.max_retry_attempts.max(1) {
            match Self::open(settings).await {
                Ok(connection) => {
                    info!(
                        "Connected to AMQP broker at {}:{}",
                        settings.host, settings.port
                    );
                    return Ok(Self { connection });
                }
                Err(e) if attempt == settings.max_retry_attempts.max(1) => {
                    return Err(MatchmakingError::AmqpConnectionFailed {
                        message: format!("Gave up after {} attempts: {}", attempt, e),
                    }
                    .into());
                }
                Err(e) => {
                    warn!(
                        "AMQP connection attempt {} failed: {}. Retrying in {:?}",
                        attempt, e, delay
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(30));
                }
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }

    async fn open(settings: &AmqpSettings) -> Result<Connection> {
        let mut args = OpenConnectionArguments::new(
            &settings.host,
            settings.port,
            &settings.username,
            &settings.password,
        );
        args.virtual_host(&settings.vhost);

        let connection =
            Connection::open(&args)
                .await
                .map_err(|e| MatchmakingError::AmqpConnectionFailed {
                    message: e.to_string(),
                })?;
        Ok(connection)
    }

    /// Open a channel on this connection
    pub async fn open_channel(&self) -> Result<Channel> {
        let channel = self.connection.open_channel(None).await.map_err(|e| {
            MatchmakingError::AmqpConnectionFailed {
                message: format!("Failed to open channel: {}", e),
            }
        })?;
        Ok(channel)
    }

    /// Close the connection
    pub async fn close(self) -> Result<()> {
        self.connection
            .close()
            .await
            .map_err(|e| MatchmakingError::AmqpConnectionFailed {
                message: format!("Failed to close connection: {}", e),
            })?;
        Ok(())
    }
}
