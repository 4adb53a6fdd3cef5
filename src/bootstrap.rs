//! Process wiring: pool, cache, module registry and server lifecycle.

use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

use bookshelf_cache::Cache;
use bookshelf_kernel::{
    settings::{CacheSettings, Settings},
    InitCtx, ModuleRegistry,
};

use crate::modules::{
    self,
    books::{service::BookService, store::PgBookStore},
};

/// Run the HTTP service until a shutdown signal arrives.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = settings.environment.as_str(),
        "bookshelf bootstrap starting"
    );

    let pool = bookshelf_db::connect(&settings.database).await?;
    bookshelf_db::health_check(&pool)
        .await
        .context("database did not answer a health check")?;
    let cache = connect_cache(&settings.cache).await;
    let registry = build_registry(&pool, cache);

    if settings.database.run_migrations {
        run_migrations(&pool, &registry).await?;
    }

    let ctx = InitCtx {
        settings: &settings,
    };
    registry
        .init_modules(&ctx)
        .await
        .context("module initialization failed")?;
    registry
        .start_modules(&ctx)
        .await
        .context("module start failed")?;

    let served = bookshelf_http::start_server(&registry, &settings).await;

    if let Err(err) = registry.stop_modules().await {
        tracing::warn!(error = %err, "module shutdown reported an error");
    }
    pool.close().await;
    tracing::info!("bookshelf stopped");

    served
}

/// Apply pending module migrations and exit. Returns the number applied.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let pool = bookshelf_db::connect(&settings.database).await?;
    let registry = build_registry(&pool, None);
    let applied = run_migrations(&pool, &registry).await?;
    pool.close().await;
    Ok(applied)
}

fn build_registry(pool: &PgPool, cache: Option<Cache>) -> ModuleRegistry {
    let books = BookService::new(Arc::new(PgBookStore::new(pool.clone())), cache);

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, books);
    registry
}

async fn run_migrations(pool: &PgPool, registry: &ModuleRegistry) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let applied = bookshelf_db::apply_migrations(pool, &migrations)
        .await
        .context("failed to apply migrations")?;

    tracing::info!(
        applied,
        total = migrations.len(),
        "database migrations complete"
    );
    Ok(applied)
}

/// The cache is optional: when it cannot be reached the service runs
/// against the store alone.
async fn connect_cache(settings: &CacheSettings) -> Option<Cache> {
    match Cache::from_settings(settings).await {
        Ok(Some(cache)) => {
            tracing::info!(
                backend = cache.backend_name(),
                ttl_secs = cache.ttl().as_secs(),
                "cache enabled"
            );
            Some(cache)
        }
        Ok(None) => {
            tracing::info!("cache disabled by configuration");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "cache unavailable; continuing without it");
            None
        }
    }
}
