//! Fieldwatch persistence layer.
//!
//! Exposes the [`EventStore`] and [`IngestQueue`] traits together with two
//! interchangeable backends:
//!
//! - [`postgres`] — the production backend (sqlx / PostgreSQL).
//! - [`memory`] — an in-memory twin with identical semantics, used by the
//!   test suites of the crates above this one.

pub mod memory;
mod models;
pub mod postgres;
pub mod store;

pub use memory::{MemoryEventStore, MemoryIngestQueue};
pub use postgres::{PgEventStore, PgIngestQueue};
pub use store::{
    DashboardStatistics, DeadLetter, EventStore, IngestQueue, Page, PageResult, QueuedMessage,
    StoreError,
};

/// Shared PostgreSQL connection pool type.
pub type DbPool = sqlx::PgPool;

/// Default maximum connections for the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Create a connection pool against the given database URL.
///
/// Pool size can be overridden via `DATABASE_MAX_CONNECTIONS`.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);

    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
