//! Libris application library
//!
//! Hosts the catalog modules and the bootstrap shared by the `libris-app`
//! binary and the `libris` CLI.

pub mod modules;

use anyhow::Context;
use axum::Router;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

/// A registry with every module initialized against `pool`.
pub struct App {
    pub registry: ModuleRegistry,
    pub pool: SqlitePool,
}

impl App {
    /// Register modules, apply their schema and run `init` + `start`.
    pub async fn assemble(settings: &Settings, pool: SqlitePool) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry);

        libris_db::apply_schema(&pool, &registry.collect_schema())
            .await
            .context("failed to apply module schema")?;

        let ctx = InitCtx {
            settings,
            db: &pool,
        };
        registry.init_modules(&ctx).await?;
        registry.start_modules(&ctx).await?;

        Ok(Self { registry, pool })
    }

    pub fn router(&self, settings: &Settings) -> Router {
        libris_http::build_router(&self.registry, settings)
    }
}

/// Run the service until Ctrl-C.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "libris bootstrap starting"
    );

    let pool = libris_db::connect(&settings.database).await?;
    let app = App::assemble(&settings, pool).await?;

    tracing::info!(modules = app.registry.len(), "libris bootstrap complete");

    libris_http::start_server(&app.registry, &settings, shutdown_signal()).await?;

    app.registry.stop_modules().await?;
    app.pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
