//! HTTP-facing hash service.
//!
//! ## Structure
//!
//! - [`handler`] - Request orchestration (`HashService`).
//! - [`routes`] - axum router, response encoding and health endpoint.

pub mod handler;
pub mod routes;

#[cfg(test)]
mod tests;
