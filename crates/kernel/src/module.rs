use async_trait::async_trait;
use axum::Router;
use sqlx::SqlitePool;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub db: &'a SqlitePool,
}

/// Idempotent DDL contributed by a module.
///
/// Statements must be safe to run on every startup (`CREATE ... IF NOT EXISTS`).
#[derive(Debug, Clone)]
pub struct Schema {
    pub id: &'static str,
    pub ddl: &'static str,
}

/// Core module trait that all Libris modules must implement
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context
    /// Called during application startup after the schema is applied
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `/api/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Return the schema this module needs, in execution order
    fn schema(&self) -> Vec<Schema> {
        vec![]
    }

    /// Start background work for this module
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources
    /// Called during application shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
