use hashgate_core::HashResponse;
use tokio::sync::oneshot;

/// Messages handled by the dispatch supervisor.
#[derive(Debug)]
pub enum DispatchRequest {
    /// A response to publish in the next batch.
    Submit(HashResponse),
    /// Drain the queue, flush the coalescer and acknowledge.
    Shutdown { response: oneshot::Sender<()> },
}
