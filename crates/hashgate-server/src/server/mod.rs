//! Server implementation for `hashgate-server`.
//!
//! ## Submodules
//!
//! - [`broker`] - Batch encoding and confirmed AMQP publishing.
//! - [`config`] - CLI and environment configuration.
//! - [`dispatch`] - Non-blocking hand-off of responses to the batcher.
//! - [`lookup`] - Client name store.
//! - [`service`] - Request orchestration and HTTP routes.
//! - [`telemetry`] - Logging, tracing and metrics setup.

pub mod broker;
pub mod config;
pub mod dispatch;
pub mod lookup;
pub mod service;
pub mod telemetry;

#[cfg(test)]
mod testing;
