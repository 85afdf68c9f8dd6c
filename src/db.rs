//! Database connection utilities.
//!
//! Provides the Postgres connection pool shared through [`AppState`](crate::AppState).

use anyhow::Context;
use sqlx::{PgPool, migrate::Migrator, postgres::PgPoolOptions};

use crate::config::Settings;

/// Establishes a connection pool to Postgres using the configured URL and size.
///
/// # Errors
/// Returns an error if the database cannot be reached.
pub async fn connect_pg_pool(settings: &Settings) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to create Postgres pool")?;

    tracing::info!(
        max_connections = settings.max_connections,
        "Connected to Postgres"
    );
    Ok(pool)
}

/// Builds a pool that only connects on first use.
///
/// # Errors
/// Returns an error if `database_url` is not a valid connection string.
pub fn lazy_pg_pool(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(database_url)
        .context("invalid DATABASE_URL")
}

/// Schema migrations embedded from `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies [`MIGRATOR`] to `pool`.
///
/// # Errors
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
