//! Resolves client ids to display names.

mod postgres;

pub use postgres::PgLookup;

use async_trait::async_trait;
use hashgate_core::LookupError;

/// Read-only client name store.
#[async_trait]
pub trait Lookup: Send + Sync + 'static {
    /// Returns the name registered for `id`.
    ///
    /// # Errors
    ///
    /// [`LookupError::NotFound`] when no client has that id, and
    /// [`LookupError::Unavailable`] when the store could not be queried.
    async fn lookup(&self, id: i64) -> Result<String, LookupError>;
}
