use super::{
    flush::Flush,
    request::{FlushRequest, WindowRequest},
    window::{Waiter, Window},
};
use core::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    time::{self, Instant},
};

/// Window actor: the only task that opens, fills and seals windows.
///
/// Holds at most one open window. The first submission while idle opens a
/// window whose deadline is `now + window`; later submissions join it until the
/// deadline fires. The deadline branch is polled first, so a submission that is
/// received after the deadline has elapsed always lands in a new window.
///
/// Sealed windows are handed to the flusher in order over `flush_tx`; the
/// actor does not wait for the flush itself, so a new window can open while
/// the previous one is still being published.
///
/// # Arguments
///
/// - `window`: Window duration. Zero flushes every submission on its own.
/// - `rx`: Requests from [`Coalescer`](super::Coalescer) handles.
/// - `flush_tx`: Queue of sealed windows for [`flush_loop`].
pub async fn window_loop<T>(
    window: Duration,
    mut rx: mpsc::Receiver<WindowRequest<T>>,
    flush_tx: mpsc::Sender<FlushRequest<T>>,
) where
    T: Send + 'static,
{
    tracing::trace!(?window, "Window actor started");

    let mut next_seq = 0_u64;
    let mut current: Option<Window<T>> = None;

    loop {
        let deadline = current.as_ref().map(Window::deadline);

        tokio::select! {
            biased;

            () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(expired) = current.take() {
                    dispatch(expired, &flush_tx).await;
                }
            }

            request = rx.recv() => match request {
                Some(WindowRequest::Submit { item, waiter }) => {
                    accept(&mut current, &mut next_seq, window, item, waiter, &flush_tx).await;
                }
                Some(WindowRequest::Shutdown { response }) => {
                    tracing::debug!("Window actor received shutdown signal");
                    let mut acks = vec![response];

                    // Submissions already queued were accepted by their callers
                    // and must not be lost.
                    rx.close();
                    while let Some(request) = rx.recv().await {
                        match request {
                            WindowRequest::Submit { item, waiter } => {
                                accept(&mut current, &mut next_seq, window, item, waiter, &flush_tx).await;
                            }
                            WindowRequest::Shutdown { response } => acks.push(response),
                        }
                    }

                    if let Some(pending) = current.take() {
                        dispatch(pending, &flush_tx).await;
                    }

                    let (drained_tx, drained_rx) = oneshot::channel();
                    if flush_tx
                        .send(FlushRequest::Drain { response: drained_tx })
                        .await
                        .is_ok()
                    {
                        let _ = drained_rx.await;
                    }

                    for ack in acks {
                        if ack.send(()).is_err() {
                            tracing::warn!("Shutdown caller went away before acknowledgement");
                        }
                    }
                    break;
                }
                None => {
                    // Every handle is gone; nothing else can join.
                    if let Some(pending) = current.take() {
                        dispatch(pending, &flush_tx).await;
                    }
                    break;
                }
            }
        }
    }

    tracing::trace!("Window actor stopped");
}

/// Admits one submission, opening a window first if idle.
async fn accept<T>(
    current: &mut Option<Window<T>>,
    next_seq: &mut u64,
    window: Duration,
    item: T,
    waiter: Waiter,
    flush_tx: &mpsc::Sender<FlushRequest<T>>,
) where
    T: Send + 'static,
{
    let open = current.get_or_insert_with(|| {
        *next_seq += 1;
        tracing::trace!(window = *next_seq, "Opening window");
        Window::open(*next_seq, Instant::now() + window)
    });

    if let Err((_, waiter)) = open.admit(item, waiter) {
        // Only open windows are ever stored in `current`.
        let _ = waiter.send(Err(crate::Error::ChannelError {
            context: "window sealed before admission".to_string(),
        }));
        return;
    }

    if window.is_zero() {
        if let Some(full) = current.take() {
            dispatch(full, flush_tx).await;
        }
    }
}

/// Seals `window` and queues it for flushing.
async fn dispatch<T>(mut window: Window<T>, flush_tx: &mpsc::Sender<FlushRequest<T>>)
where
    T: Send + 'static,
{
    window.seal();
    tracing::trace!(
        window = window.seq(),
        items = window.len(),
        "Window sealed"
    );

    if let Err(mpsc::error::SendError(request)) = flush_tx.send(FlushRequest::Window(window)).await
    {
        tracing::error!("Flusher stopped; failing sealed window");
        if let FlushRequest::Window(mut window) = request {
            window.abandon("flusher stopped");
        }
    }
}

/// Flusher: runs the flush of each sealed window, one at a time, in the order
/// the windows were sealed.
///
/// Each window's outcome is fanned out to all of its waiters before the next
/// window is taken, which is what serializes flushes across windows.
pub async fn flush_loop<T, F>(flusher: F, mut rx: mpsc::Receiver<FlushRequest<T>>)
where
    T: Send + 'static,
    F: Flush<T>,
{
    tracing::trace!("Flusher started");

    while let Some(request) = rx.recv().await {
        match request {
            FlushRequest::Window(mut window) => {
                let items = window.take_items();
                let count = items.len();
                let outcome = flusher.flush(items).await;

                match &outcome {
                    Ok(()) => {
                        tracing::debug!(window = window.seq(), items = count, "Window flushed");
                    }
                    Err(e) => {
                        tracing::warn!(window = window.seq(), items = count, "Window flush failed: {e}");
                    }
                }

                window.close(&outcome);
            }
            FlushRequest::Drain { response } => {
                let _ = response.send(());
                break;
            }
        }
    }

    tracing::trace!("Flusher stopped");
}
