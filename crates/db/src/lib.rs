//! SQLite pool factory and schema bootstrap for Libris.

use std::str::FromStr;

use anyhow::Context;
use libris_kernel::{settings::DatabaseSettings, Schema};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Open a connection pool for the configured database.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(settings.max_connections);

    if settings.is_in_memory() {
        // Every connection to `:memory:` is a separate database.
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{}'", settings.url))?;

    tracing::info!(
        target: "libris-db",
        url = %settings.url,
        in_memory = settings.is_in_memory(),
        "database pool ready"
    );

    Ok(pool)
}

/// Run every collected schema fragment inside a single transaction.
///
/// Fragments are idempotent DDL, so this is safe on every startup.
pub async fn apply_schema(pool: &SqlitePool, schema: &[(String, Schema)]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await.context("failed to open schema transaction")?;

    for (module, fragment) in schema {
        tracing::debug!(target: "libris-db", module = %module, id = fragment.id, "applying schema");

        sqlx::raw_sql(fragment.ddl)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("schema '{}' of module '{}' failed", fragment.id, module))?;
    }

    tx.commit().await.context("failed to commit schema")?;

    tracing::info!(target: "libris-db", fragments = schema.len(), "schema applied");
    Ok(())
}
