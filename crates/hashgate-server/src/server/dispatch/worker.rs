use super::request::DispatchRequest;
use crate::server::telemetry::increment_submission_errors;
use hashgate_core::{Coalescer, HashResponse, Result};
use tokio::{sync::mpsc, task::JoinSet};

/// Supervisor task behind [`SubmissionQueue`](super::SubmissionQueue).
///
/// Every response is handed to the coalescer in queue order, before any later
/// shutdown reaches it. The flush outcome is awaited in a [`JoinSet`] and
/// logged; nothing is reported back to the request that produced the
/// response.
pub async fn dispatch_loop(
    mut rx: mpsc::Receiver<DispatchRequest>,
    coalescer: Coalescer<HashResponse>,
) {
    tracing::trace!("Dispatcher started");

    let mut pending = JoinSet::new();
    let mut acks = Vec::new();

    loop {
        tokio::select! {
            request = rx.recv() => match request {
                Some(DispatchRequest::Submit(response)) => {
                    submit(&coalescer, &mut pending, response).await;
                }
                Some(DispatchRequest::Shutdown { response }) => {
                    tracing::debug!("Dispatcher received shutdown signal");
                    acks.push(response);
                    break;
                }
                None => break,
            },
            Some(joined) = pending.join_next(), if !pending.is_empty() => {
                log_outcome(joined);
            }
        }
    }

    // Anything that made it into the queue is still delivered.
    rx.close();
    while let Some(request) = rx.recv().await {
        match request {
            DispatchRequest::Submit(response) => {
                submit(&coalescer, &mut pending, response).await;
            }
            DispatchRequest::Shutdown { response } => acks.push(response),
        }
    }

    if let Err(e) = coalescer.shutdown().await {
        tracing::error!("Error during coalescer shutdown: {e}");
    }

    while let Some(joined) = pending.join_next().await {
        log_outcome(joined);
    }

    for ack in acks {
        if ack.send(()).is_err() {
            tracing::error!("Dispatcher failed to acknowledge shutdown");
        }
    }

    tracing::trace!("Dispatcher stopped");
}

async fn submit(
    coalescer: &Coalescer<HashResponse>,
    pending: &mut JoinSet<Result<()>>,
    response: HashResponse,
) {
    match coalescer.enqueue(response).await {
        Ok(ticket) => {
            pending.spawn(ticket.outcome());
        }
        Err(e) => {
            increment_submission_errors();
            tracing::warn!("Coalescer refused response: {e}");
        }
    }
}

fn log_outcome(joined: core::result::Result<Result<()>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            increment_submission_errors();
            tracing::warn!("Batch with response failed: {e}");
        }
        Err(e) => {
            increment_submission_errors();
            tracing::error!("Submission task failed: {e}");
        }
    }
}
