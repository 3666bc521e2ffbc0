//! Database schema migrations
//!
//! Versioned, idempotent migrations run after table creation so databases
//! written by older revisions upgrade in place.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - they must stay stable for users upgrading
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Check before altering** - every migration must be safe to run twice
//! 4. **Prefer ALTER TABLE** - rebuild a table only when SQLite cannot alter it in place

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
            .bind(table)
            .bind(column)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Migration v1: integer `order` column becomes text `order_key`
///
/// SQLite cannot drop a NOT NULL column in place, so the table is rebuilt.
/// Old values are copied verbatim; they are read back as legacy keys and
/// rewritten canonically only when moved.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if has_column(pool, "performances", "order_key").await? {
        return Ok(());
    }

    if !has_column(pool, "performances", "order").await? {
        warn!("Migration v1: performances has neither order nor order_key; skipping");
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE performances_v1 (
            id TEXT PRIMARY KEY,
            concert_id TEXT NOT NULL REFERENCES concerts(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            composer TEXT NOT NULL,
            performers TEXT NOT NULL,
            order_key TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    let copied = sqlx::query(
        r#"
        INSERT INTO performances_v1 (id, concert_id, title, composer, performers, order_key)
        SELECT id, concert_id, title, composer, performers, CAST("order" AS TEXT)
        FROM performances
        "#,
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query("DROP TABLE performances").execute(&mut *tx).await?;
    sqlx::query("ALTER TABLE performances_v1 RENAME TO performances")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_performances_concert ON performances(concert_id)",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!("Migration v1: copied {} legacy order values to order_key", copied);

    Ok(())
}

/// Migration v2: add `frozen` flag to concerts
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    if has_column(pool, "concerts", "frozen").await? {
        return Ok(());
    }

    sqlx::query("ALTER TABLE concerts ADD COLUMN frozen INTEGER NOT NULL DEFAULT 0")
        .execute(pool)
        .await?;
    info!("Migration v2: added frozen column to concerts");

    Ok(())
}
