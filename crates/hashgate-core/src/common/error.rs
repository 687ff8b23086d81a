//! Error types for the hashing service.
//!
//! This module defines the central `Error` enum, which captures every
//! recoverable and reportable failure within the request path and the batch
//! pipeline. It implements [`IntoResponse`] so handlers can propagate errors
//! to HTTP clients with `?`.
//!
//! ## Error Cases
//! - `Decode`: The request body was malformed or missing fields.
//! - `Lookup`: The lookup collaborator could not resolve the identifier.
//! - `Encode`: A response or a batch could not be serialized.
//! - `Publish`: The broker rejected or failed to confirm a batch.
//! - `Rejected`: The batch prefilter refused an item.
//! - `ChannelError`: An internal communication failure between tasks.
//! - `RequestCancelled`: The request was abandoned before it completed.
//! - `ServiceShutdown`: Work arrived while the service was shutting down.
//!
//! `Error` is `Clone` because a single flush outcome is delivered to every
//! caller that joined the same window.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

pub type Result<T> = core::result::Result<T, Error>;

/// Failure reported by a lookup collaborator.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// No record exists for the identifier.
    #[error("no client with id {id}")]
    NotFound { id: i64 },

    /// The backing store could not be queried.
    #[error("lookup unavailable: {0}")]
    Unavailable(String),
}

/// Unified error type for the hashing service.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Publish error: {0}")]
    Publish(String),

    /// The batch prefilter refused the item before it reached a window.
    #[error("Batch item rejected: {reason}")]
    Rejected { reason: String },

    /// Internal channel send/receive failure (e.g., closed channel or a task
    /// that panicked).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    #[error("Request cancelled")]
    RequestCancelled,

    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Every failure is reported as a server-side error, with the error
        // text as the body. Only shutdown is distinguishable by status.
        let status = match self {
            Error::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
