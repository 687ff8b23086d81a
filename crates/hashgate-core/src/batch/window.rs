use crate::common::error::{Error, Result};
use tokio::{sync::oneshot, time::Instant};

/// Channel through which a submitter learns the outcome of its window's flush.
pub(crate) type Waiter = oneshot::Sender<Result<()>>;

/// Lifecycle of a [`Window`].
///
/// Transitions only move forward: `Open -> Flushing -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Accepting items until the deadline.
    Open,
    /// Sealed; the item list has been (or is about to be) handed to the flush.
    Flushing,
    /// The flush outcome has been delivered to every waiter.
    Closed,
}

/// A batch-in-progress bounded by a deadline.
///
/// Items are kept in admission order alongside the waiter of the submission
/// that produced them. A window is owned by exactly one task at a time: the
/// coalescer actor while `Open`, the flusher once `Flushing`.
#[derive(Debug)]
pub struct Window<T> {
    seq: u64,
    deadline: Instant,
    state: WindowState,
    items: Vec<T>,
    waiters: Vec<Waiter>,
}

impl<T> Window<T> {
    pub(crate) const fn open(seq: u64, deadline: Instant) -> Self {
        Self {
            seq,
            deadline,
            state: WindowState::Open,
            items: Vec::new(),
            waiters: Vec::new(),
        }
    }

    pub const fn seq(&self) -> u64 {
        self.seq
    }

    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    pub const fn state(&self) -> WindowState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends `item` and registers `waiter` for this window's outcome.
    ///
    /// Hands both back untouched if the window is no longer open.
    pub(crate) fn admit(&mut self, item: T, waiter: Waiter) -> core::result::Result<(), (T, Waiter)> {
        if self.state != WindowState::Open {
            return Err((item, waiter));
        }
        self.items.push(item);
        self.waiters.push(waiter);
        Ok(())
    }

    /// Stops admission. Idempotent.
    pub(crate) fn seal(&mut self) {
        if self.state == WindowState::Open {
            self.state = WindowState::Flushing;
        }
    }

    /// Moves the item list out for flushing. Only a sealed window yields its
    /// items, and only once.
    pub(crate) fn take_items(&mut self) -> Vec<T> {
        debug_assert_eq!(self.state, WindowState::Flushing);
        if self.state != WindowState::Flushing {
            return Vec::new();
        }
        core::mem::take(&mut self.items)
    }

    /// Delivers `outcome` to every waiter and marks the window closed.
    ///
    /// Waiters whose receiver has gone away are skipped.
    pub(crate) fn close(&mut self, outcome: &Result<()>) {
        self.state = WindowState::Closed;
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Fails every waiter without flushing. Used when the flusher is gone.
    pub(crate) fn abandon(&mut self, context: &str) {
        self.seal();
        self.items.clear();
        self.close(&Err(Error::ChannelError {
            context: context.to_string(),
        }));
    }
}
