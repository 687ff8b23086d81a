//! Request orchestration for `POST /hash`.
//!
//! [`HashService::handle`] decodes the request, then runs the digest and the
//! client lookup as two independent tasks and joins them. Both tasks hang off a
//! per-request [`CancellationToken`] that is cancelled when the request future
//! is dropped, so a disconnected client releases its work promptly. The
//! finished response is handed to the [`SubmissionQueue`] without waiting.

use crate::server::{dispatch::SubmissionQueue, lookup::Lookup};
use core::future::Future;
use hashgate_core::{Error, HashRequest, HashResponse, Result, digest};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

#[derive(Clone)]
pub struct HashService {
    lookup: Arc<dyn Lookup>,
    submissions: SubmissionQueue,
    /// Cancelled when shutdown begins; new requests are refused.
    shutdown_token: CancellationToken,
    /// Parent of every per-request token; cancelled once draining is over.
    work_token: CancellationToken,
}

impl HashService {
    pub fn new(lookup: Arc<dyn Lookup>, submissions: SubmissionQueue) -> Self {
        Self {
            lookup,
            submissions,
            shutdown_token: CancellationToken::new(),
            work_token: CancellationToken::new(),
        }
    }

    pub fn is_serving(&self) -> bool {
        !self.shutdown_token.is_cancelled()
    }

    /// Refuses new requests while in-flight ones are allowed to finish.
    pub fn begin_shutdown(&self) {
        if !self.shutdown_token.is_cancelled() {
            tracing::info!("Refusing new requests");
            self.shutdown_token.cancel();
        }
    }

    /// Cancels any remaining request work and flushes every queued response
    /// to the broker.
    pub async fn shutdown(&self) -> Result<()> {
        self.begin_shutdown();
        self.work_token.cancel();
        self.submissions.shutdown().await
    }

    /// Computes the response for a raw request body.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once shutdown has begun.
    /// - [`Error::Decode`] for malformed JSON or missing fields.
    /// - [`Error::Lookup`] when the client name cannot be resolved.
    /// - [`Error::RequestCancelled`] when the service cancels in-flight work.
    #[instrument(skip_all, fields(id))]
    pub async fn handle(&self, body: &[u8]) -> Result<HashResponse> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let request: HashRequest =
            serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))?;
        tracing::Span::current().record("id", request.id);

        let token = self.work_token.child_token();
        let _guard = token.clone().drop_guard();

        let data = request.data;
        let hash_task = spawn_cancellable(token.clone(), async move {
            tokio::task::spawn_blocking(move || digest(data.as_bytes()))
                .await
                .map_err(|e| joined_error("digest", &e))
        });

        let lookup = Arc::clone(&self.lookup);
        let id = request.id;
        let name_task = spawn_cancellable(token, async move {
            lookup.lookup(id).await.map_err(Error::from)
        });

        let (hash, name) = tokio::join!(hash_task, name_task);
        let name = flatten("lookup", name)?;
        let hash = flatten("digest", hash)?;

        let response = HashResponse::new(name, hash);
        // Outcome is logged by the dispatcher.
        let _ = self.submissions.enqueue(response.clone());

        Ok(response)
    }
}

/// Spawns `fut`, abandoning it with [`Error::RequestCancelled`] as soon as
/// `token` is cancelled.
pub(crate) fn spawn_cancellable<T, F>(token: CancellationToken, fut: F) -> JoinHandle<Result<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(Error::RequestCancelled),
            res = fut => res,
        }
    })
}

fn joined_error(task: &str, e: &JoinError) -> Error {
    Error::ChannelError {
        context: format!("{task} task failed: {e}"),
    }
}

fn flatten<T>(task: &str, joined: core::result::Result<Result<T>, JoinError>) -> Result<T> {
    joined.map_err(|e| joined_error(task, &e))?
}
