use super::Lookup;
use crate::server::config::SqlConfig;
use async_trait::async_trait;
use hashgate_core::LookupError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::instrument;

const SELECT_CLIENT_NAME: &str = "SELECT name FROM clients WHERE id = $1";

/// [`Lookup`] backed by the `clients` table of a PostgreSQL database.
#[derive(Clone, Debug)]
pub struct PgLookup {
    pool: PgPool,
}

impl PgLookup {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool and establishes the first connection, so an unreachable
    /// store fails at startup rather than on the first request.
    pub async fn connect(config: &SqlConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_open_conns)
            .min_connections(config.max_idle_conns)
            .idle_timeout(config.conn_max_idle_time)
            .max_lifetime(config.conn_max_lifetime)
            .connect(&config.data_source_name)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Lookup for PgLookup {
    #[instrument(level = "debug", skip(self))]
    async fn lookup(&self, id: i64) -> Result<String, LookupError> {
        sqlx::query_scalar::<_, String>(SELECT_CLIENT_NAME)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?
            .ok_or(LookupError::NotFound { id })
    }
}
