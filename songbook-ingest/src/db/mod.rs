//! Database access for songbook-ingest
//!
//! SQLite song database in the root folder

pub mod songs;

pub use songs::SqliteRecordStore;

use crate::error::IngestResult;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the database file and the `songs` table when missing.
pub async fn init_database_pool(db_path: &Path) -> IngestResult<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the songs table if it doesn't exist
pub async fn init_tables(pool: &SqlitePool) -> IngestResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            external_id TEXT NOT NULL,
            source_url TEXT,
            genre TEXT NOT NULL,
            tuning TEXT NOT NULL,
            instrument_type TEXT NOT NULL,
            difficulty TEXT,
            rating REAL,
            votes INTEGER,
            version INTEGER,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (title, artist, external_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_title_artist ON songs (title, artist)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (songs)");

    Ok(())
}
