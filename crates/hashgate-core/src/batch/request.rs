use super::window::{Waiter, Window};
use tokio::sync::oneshot;

/// A message sent from a [`Coalescer`](super::Coalescer) handle to the window
/// actor.
#[derive(Debug)]
pub enum WindowRequest<T> {
    /// Admit `item` into the open window (opening one if idle).
    ///
    /// - `waiter`: receives the flush outcome of the window the item joins.
    Submit { item: T, waiter: Waiter },

    /// Flush whatever is pending and stop.
    ///
    /// - `response`: acknowledged once every queued flush has completed.
    Shutdown { response: oneshot::Sender<()> },
}

/// A message sent from the window actor to the flusher task.
#[derive(Debug)]
pub enum FlushRequest<T> {
    /// Flush a sealed window and close it.
    Window(Window<T>),

    /// Acknowledge once all previously queued windows are closed, then stop.
    Drain { response: oneshot::Sender<()> },
}
