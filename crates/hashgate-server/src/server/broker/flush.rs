use super::Publisher;
use crate::server::telemetry::{
    increment_batches_published, increment_publish_failures, record_batch_size,
};
use async_trait::async_trait;
use core::time::Duration;
use hashgate_core::{Error, Flush, HashResponse, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Caps the exponential backoff at `backoff * 2^16`.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// How a batch is retried when the broker fails.
///
/// The default makes one attempt and treats its failure as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishPolicy {
    /// Total attempts per batch, including the first. At least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt. Doubles on each further attempt.
    pub backoff: Duration,
    /// Cancel the fatal token once a batch has exhausted its attempts.
    pub fatal: bool,
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(100),
            fatal: true,
        }
    }
}

impl PublishPolicy {
    /// Delay to wait after the failed `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.backoff.saturating_mul(1 << shift)
    }
}

/// Flush step of the response coalescer: encodes the window as one JSON array
/// and publishes it.
pub struct BrokerFlush<P> {
    publisher: Arc<P>,
    policy: PublishPolicy,
    fatal: CancellationToken,
}

impl<P> BrokerFlush<P>
where
    P: Publisher,
{
    /// `fatal` is cancelled when a batch fails for good and the policy is
    /// fatal. The binary watches it to exit.
    pub const fn new(publisher: Arc<P>, policy: PublishPolicy, fatal: CancellationToken) -> Self {
        Self {
            publisher,
            policy,
            fatal,
        }
    }
}

#[async_trait]
impl<P> Flush<HashResponse> for BrokerFlush<P>
where
    P: Publisher,
{
    async fn flush(&self, items: Vec<HashResponse>) -> Result<()> {
        let size = items.len();
        let body = serde_json::to_vec(&items).map_err(|e| Error::Encode(e.to_string()))?;

        record_batch_size(size as f64);
        tracing::debug!("Publishing batch of {size} messages");

        let mut attempt = 1;
        loop {
            let err = match self.publisher.publish(&body).await {
                Ok(()) => {
                    increment_batches_published();
                    return Ok(());
                }
                Err(e) => e,
            };

            increment_publish_failures();
            if attempt >= self.policy.max_attempts {
                tracing::error!(attempts = attempt, "Dropping batch of {size} messages: {err}");
                if self.policy.fatal {
                    self.fatal.cancel();
                }
                return Err(err);
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!(attempt, "Publish failed, retrying in {delay:?}: {err}");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
