//! Shared types and error definitions used across `hashgate`.
//!
//! ## Submodules
//!
//! - [`error`] - Centralized error type used by the orchestrator, the batch
//!   coalescer and the HTTP layer.
//! - [`types`] - Wire types for the `/hash` endpoint and the broker payload.

pub mod error;
pub mod types;

pub use error::{Error, LookupError, Result};
pub use types::{HashRequest, HashResponse};
