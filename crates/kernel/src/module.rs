use async_trait::async_trait;
use axum::Router;

use crate::settings::Settings;

/// Borrowed process state handed to lifecycle hooks.
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
}

/// One forward-only schema step. `id` must be unique within its module and
/// sort after every earlier step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

impl Migration {
    pub const fn new(id: &'static str, up: &'static str) -> Self {
        Self { id, up }
    }
}

/// A feature slice of the service: routes, schema and lifecycle hooks.
///
/// Startup order is migrations, `init`, `start`, then the HTTP server;
/// `stop` runs once the server has drained.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name, also the path segment under `/api/v1`.
    fn name(&self) -> &'static str;

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes relative to the module mount point; `/` is the collection.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment with `paths` and `components.schemas`, paths
    /// relative to the mount point.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    fn migrations(&self) -> Vec<Migration> {
        Vec::new()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
