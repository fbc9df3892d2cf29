//! Database access for the BookHub backend.
//!
//! Pool bootstrap, migrations, and the model/repository layers. All access
//! goes through PostgreSQL via sqlx.

pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Shared connection pool type.
pub type DbPool = PgPool;

/// Create a connection pool against `database_url`.
///
/// Fails if the database is unreachable; startup treats that as fatal
/// rather than continuing in a deferred/unready state.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Create a pool without establishing a connection up front.
///
/// Used by integration tests that exercise routes which never touch the
/// database.
pub fn create_lazy_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    Ok(PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(1))
        .connect_lazy(database_url)?)
}

/// Round-trip a trivial query to verify the pool is usable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Apply pending migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
