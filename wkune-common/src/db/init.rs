//! Database initialization
//!
//! Creates the database file and schema on first run; safe to call on an
//! existing database (every statement is `IF NOT EXISTS`).

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Per-connection pragmas go through the connect options so every pooled
    // connection gets them. WAL allows concurrent readers with one writer.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Single connection that never expires, so the data lives as long as the
/// pool. Used by tests and by `--ephemeral` runs.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    debug!("Initialized in-memory database");

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_sessions_table(pool).await?;
    create_members_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the sessions table
///
/// Timestamps are Unix epoch milliseconds; list columns hold JSON arrays.
async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            code TEXT PRIMARY KEY,
            creator_id TEXT NOT NULL,
            phase TEXT NOT NULL DEFAULT 'adding',
            created_at INTEGER NOT NULL,
            last_activity_at INTEGER NOT NULL,
            excluded_items TEXT NOT NULL DEFAULT '[]',
            restart_votes TEXT NOT NULL DEFAULT '[]',
            current_result TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_activity ON sessions(last_activity_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the members table
///
/// `id` preserves join order, which drives item encounter order.
async fn create_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_code TEXT NOT NULL,
            member_id TEXT NOT NULL,
            items TEXT NOT NULL DEFAULT '[]',
            is_ready INTEGER NOT NULL DEFAULT 0,
            accepted_items TEXT NOT NULL DEFAULT '[]',
            is_observer INTEGER NOT NULL DEFAULT 0,
            last_seen_at INTEGER NOT NULL,
            FOREIGN KEY (session_code) REFERENCES sessions(code) ON DELETE CASCADE,
            UNIQUE(session_code, member_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_members_session ON members(session_code)")
        .execute(pool)
        .await?;

    Ok(())
}
