use super::{request::DispatchRequest, worker::dispatch_loop};
use crate::server::telemetry::increment_submissions_dropped;
use hashgate_core::{Coalescer, Error, HashResponse, Result};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tokio_util::sync::CancellationToken;

/// Non-blocking entry point for responses on their way to the broker.
#[derive(Clone, Debug)]
pub struct SubmissionQueue {
    tx: mpsc::Sender<DispatchRequest>,
    shutdown_token: CancellationToken,
}

impl SubmissionQueue {
    /// Spawns the supervisor that feeds `coalescer`. At most `buffer`
    /// responses wait in the queue.
    pub fn new(coalescer: Coalescer<HashResponse>, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        tokio::spawn(dispatch_loop(rx, coalescer));

        Self {
            tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Queues `response` without waiting. A full or closed queue drops it.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once shutdown has begun.
    /// - [`Error::ChannelError`] when the queue is full or the supervisor is
    ///   gone.
    ///
    /// Both cases are logged here; callers may ignore the result.
    pub fn enqueue(&self, response: HashResponse) -> Result<()> {
        let err = if self.shutdown_token.is_cancelled() {
            Error::ServiceShutdown
        } else {
            match self.tx.try_send(DispatchRequest::Submit(response)) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(_)) => Error::ChannelError {
                    context: "submission queue full".to_string(),
                },
                Err(TrySendError::Closed(_)) => Error::ChannelError {
                    context: "submission queue closed".to_string(),
                },
            }
        };

        increment_submissions_dropped();
        tracing::warn!("Dropping response: {err}");
        Err(err)
    }

    /// Stops accepting responses and waits until every queued response has
    /// been flushed.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Refusing new submissions");
        self.shutdown_token.cancel();

        let (response, done) = oneshot::channel();
        if self
            .tx
            .send(DispatchRequest::Shutdown { response })
            .await
            .is_err()
        {
            tracing::debug!("Dispatcher already stopped");
            return Ok(());
        }

        done.await.map_err(|_| Error::ChannelError {
            context: "dispatcher dropped shutdown acknowledgement".to_string(),
        })?;

        tracing::info!("Dispatcher shutdown complete");
        Ok(())
    }
}
