//! Time-windowed batch coalescing.
//!
//! Submissions that arrive while a window is open are collected in order and
//! flushed together once the window's deadline passes. Each window moves
//! through `Open -> Flushing -> Closed` exactly once:
//!
//! - the window actor is the single writer of the open window and the only
//!   task that seals it;
//! - the flusher runs the [`Flush`] operation for each sealed window, one at a
//!   time, and fans the outcome out to the window's waiters.
//!
//! ## Submodules
//!
//! - `coalescer` - Public handle, configuration and shutdown.
//! - `window` - The window state machine.
//! - `worker` - Actor and flusher task loops.

mod coalescer;
mod flush;
mod request;
mod window;
mod worker;

pub use coalescer::{
    Coalescer, CoalescerConfig, DEFAULT_FLUSH_BUFFER, DEFAULT_SUBMIT_BUFFER, Prefilter, Ticket,
};
pub use flush::Flush;
