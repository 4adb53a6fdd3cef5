//! Postgres pool factory and the module migration runner.

use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};

use bookshelf_kernel::{settings::DatabaseSettings, Migration};

/// Bookkeeping table for applied module migrations.
const MIGRATIONS_TABLE: &str = "_bookshelf_migrations";

/// Open a connection pool against the configured database.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.url)
        .await
        .with_context(|| "failed to connect to database")?;

    tracing::info!(
        target: "bookshelf-db",
        max_connections = settings.max_connections,
        "database pool established"
    );
    Ok(pool)
}

/// Round-trip a trivial query.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Apply every migration not yet recorded, each in its own transaction.
///
/// `migrations` must already be in application order (see
/// `ModuleRegistry::collect_migrations`). Returns the number applied.
pub async fn apply_migrations(
    pool: &PgPool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<usize> {
    sqlx::raw_sql(&format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
            module TEXT NOT NULL,
            id TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (module, id)
        )"
    ))
    .execute(pool)
    .await
    .with_context(|| "failed to create migrations table")?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let already: Option<i32> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM {MIGRATIONS_TABLE} WHERE module = $1 AND id = $2"
        ))
        .bind(module)
        .bind(migration.id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to read migration state for {module}/{}", migration.id))?;

        if already.is_some() {
            tracing::debug!(target: "bookshelf-db", module = %module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {module}/{} failed", migration.id))?;

        sqlx::query(&format!(
            "INSERT INTO {MIGRATIONS_TABLE} (module, id) VALUES ($1, $2)"
        ))
        .bind(module)
        .bind(migration.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(target: "bookshelf-db", module = %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
