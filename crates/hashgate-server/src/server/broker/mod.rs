//! Publishing of coalesced response batches.
//!
//! - [`Publisher`]: a single publish of an already encoded body.
//! - [`AmqpPublisher`]: confirmed publishes to an AMQP exchange.
//! - [`BrokerFlush`]: the coalescer's flush step, which encodes a window and
//!   publishes it under a [`PublishPolicy`].

mod amqp;
mod flush;

pub use amqp::AmqpPublisher;
pub use flush::{BrokerFlush, PublishPolicy};

use async_trait::async_trait;
use hashgate_core::Result;

#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    /// Publishes `body` and waits for the broker to accept it.
    ///
    /// # Errors
    ///
    /// Returns [`hashgate_core::Error::Publish`] when the broker cannot be
    /// reached or refuses the message.
    async fn publish(&self, body: &[u8]) -> Result<()>;
}
