//! Hand-off of finished responses to the batch coalescer.
//!
//! The request path must never wait on batching, so responses go through a
//! bounded queue drained by a supervisor task. The supervisor submits each
//! response to the [`Coalescer`](hashgate_core::Coalescer) and logs the outcome
//! of every flush.

mod manager;
mod request;
mod worker;

pub use manager::SubmissionQueue;

#[cfg(test)]
mod tests;
