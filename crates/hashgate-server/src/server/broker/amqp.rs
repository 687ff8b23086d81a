use super::Publisher;
use crate::server::config::AmqpConfig;
use async_trait::async_trait;
use hashgate_core::{Error, Result};
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties,
    options::{BasicPublishOptions, ConfirmSelectOptions},
};

const CONTENT_TYPE: &str = "application/json";

/// Publishes to a fixed exchange and routing key over one channel in confirm
/// mode.
pub struct AmqpPublisher {
    connection: Connection,
    channel: Channel,
    exchange: String,
    routing_key: String,
}

impl AmqpPublisher {
    /// Dials the broker and opens the publishing channel.
    pub async fn connect(config: &AmqpConfig) -> lapin::Result<Self> {
        let connection = Connection::connect(
            &config.uri,
            ConnectionProperties::default().with_connection_name("hashgate".into()),
        )
        .await?;

        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        tracing::debug!(
            exchange = %config.exchange,
            routing_key = %config.routing_key,
            "AMQP channel ready"
        );

        Ok(Self {
            connection,
            channel,
            exchange: config.exchange.clone(),
            routing_key: config.routing_key.clone(),
        })
    }

    pub async fn close(&self) {
        if let Err(e) = self.channel.close(200, "shutdown").await {
            tracing::debug!("Error closing AMQP channel: {e}");
        }
        if let Err(e) = self.connection.close(200, "shutdown").await {
            tracing::debug!("Error closing AMQP connection: {e}");
        }
    }
}

fn publish_error(e: lapin::Error) -> Error {
    Error::Publish(e.to_string())
}

#[async_trait]
impl Publisher for AmqpPublisher {
    async fn publish(&self, body: &[u8]) -> Result<()> {
        let confirmation = self
            .channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_content_type(CONTENT_TYPE.into()),
            )
            .await
            .map_err(publish_error)?
            .await
            .map_err(publish_error)?;

        if confirmation.is_nack() {
            return Err(Error::Publish(format!(
                "broker rejected publish to exchange {}",
                self.exchange
            )));
        }
        Ok(())
    }
}
