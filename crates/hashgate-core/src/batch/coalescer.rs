//! Handle to a time-windowed batching engine.
//!
//! A [`Coalescer`] owns two background tasks: the window actor, which is the
//! single writer of window state, and the flusher, which runs the [`Flush`]
//! operation for each sealed window in turn. Handles are cheap to clone and
//! only talk to the actor through a bounded channel.

use super::{
    flush::Flush,
    request::WindowRequest,
    worker::{flush_loop, window_loop},
};
use crate::common::error::{Error, Result};
use core::{fmt, time::Duration};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Default capacity of the submission channel.
pub const DEFAULT_SUBMIT_BUFFER: usize = 1024;

/// Default number of sealed windows that may wait for the flusher.
pub const DEFAULT_FLUSH_BUFFER: usize = 8;

/// Synchronous admission check run before an item is sent to the actor.
pub type Prefilter<T> = Arc<dyn Fn(&T) -> Result<()> + Send + Sync>;

/// Tuning for a [`Coalescer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerConfig {
    /// How long a window stays open after its first submission.
    pub window: Duration,
    /// Capacity of the submission channel. Submitters wait when it is full.
    pub submit_buffer: usize,
    /// Sealed windows allowed to queue behind an in-progress flush before the
    /// actor waits.
    pub flush_buffer: usize,
}

impl CoalescerConfig {
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            submit_buffer: DEFAULT_SUBMIT_BUFFER,
            flush_buffer: DEFAULT_FLUSH_BUFFER,
        }
    }

    pub const fn with_submit_buffer(mut self, submit_buffer: usize) -> Self {
        self.submit_buffer = submit_buffer;
        self
    }
}

/// Coalesces concurrent submissions into windowed flushes.
///
/// Every call to [`submit`](Self::submit) resolves with the outcome of the
/// flush of the window its item joined. Items are never deduplicated, never
/// dropped and appear in exactly one window, in the order the actor received
/// them.
pub struct Coalescer<T> {
    tx: mpsc::Sender<WindowRequest<T>>,
    prefilter: Option<Prefilter<T>>,
    shutdown_token: CancellationToken,
    window: Duration,
}

impl<T> Clone for Coalescer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            prefilter: self.prefilter.clone(),
            shutdown_token: self.shutdown_token.clone(),
            window: self.window,
        }
    }
}

impl<T> fmt::Debug for Coalescer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coalescer")
            .field("window", &self.window)
            .field("prefilter", &self.prefilter.is_some())
            .field("shutdown", &self.shutdown_token.is_cancelled())
            .finish()
    }
}

/// Pending result of an item accepted by [`Coalescer::enqueue`].
#[derive(Debug)]
#[must_use = "a ticket does nothing unless its outcome is awaited"]
pub struct Ticket {
    outcome: oneshot::Receiver<Result<()>>,
}

impl Ticket {
    /// Waits for the flush of the window the item joined.
    pub async fn outcome(self) -> Result<()> {
        self.outcome.await.map_err(|_| Error::ChannelError {
            context: "window dropped before its flush completed".to_string(),
        })?
    }
}

impl<T> Coalescer<T>
where
    T: Send + 'static,
{
    /// Spawns the window actor and the flusher on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new<F>(config: CoalescerConfig, flusher: F) -> Self
    where
        F: Flush<T>,
    {
        let (tx, rx) = mpsc::channel(config.submit_buffer.max(1));
        let (flush_tx, flush_rx) = mpsc::channel(config.flush_buffer.max(1));

        tokio::spawn(window_loop(config.window, rx, flush_tx));
        tokio::spawn(flush_loop(flusher, flush_rx));

        Self {
            tx,
            prefilter: None,
            shutdown_token: CancellationToken::new(),
            window: config.window,
        }
    }

    /// Installs a check that every item must pass before joining a window.
    ///
    /// A rejected item fails only its own submission, with the prefilter's
    /// error; no window is opened on its behalf.
    #[must_use]
    pub fn with_prefilter<P>(mut self, prefilter: P) -> Self
    where
        P: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        self.prefilter = Some(Arc::new(prefilter));
        self
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Adds `item` to the open window and waits for that window's flush.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once [`shutdown`](Self::shutdown) has begun.
    /// - Whatever the prefilter returns for a rejected item.
    /// - The flush error of the window, shared with every other submitter of
    ///   that window.
    /// - [`Error::ChannelError`] if the background tasks are gone.
    pub async fn submit(&self, item: T) -> Result<()> {
        self.enqueue(item).await?.outcome().await
    }

    /// Hands `item` to the window actor without waiting for the flush.
    ///
    /// Once this returns, the item is queued ahead of any later
    /// [`shutdown`](Self::shutdown) and will be part of a flush. The returned
    /// [`Ticket`] resolves with that flush's outcome.
    ///
    /// # Errors
    ///
    /// Same admission errors as [`submit`](Self::submit).
    pub async fn enqueue(&self, item: T) -> Result<Ticket> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        if let Some(prefilter) = &self.prefilter {
            (**prefilter)(&item)?;
        }

        let (waiter, outcome) = oneshot::channel();
        if self
            .tx
            .send(WindowRequest::Submit { item, waiter })
            .await
            .is_err()
        {
            return Err(if self.shutdown_token.is_cancelled() {
                Error::ServiceShutdown
            } else {
                Error::ChannelError {
                    context: "window actor stopped".to_string(),
                }
            });
        }

        Ok(Ticket { outcome })
    }

    /// Stops admission, flushes the pending window without waiting for its
    /// deadline and waits for every queued flush to finish.
    ///
    /// Safe to call more than once; later calls return once the actor is gone.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_token.cancel();

        let (response, done) = oneshot::channel();
        if self
            .tx
            .send(WindowRequest::Shutdown { response })
            .await
            .is_err()
        {
            tracing::debug!("Coalescer already stopped");
            return Ok(());
        }

        done.await.map_err(|_| Error::ChannelError {
            context: "window actor dropped shutdown acknowledgement".to_string(),
        })
    }
}
