//! Song database operations
//!
//! SQLite implementation of the pipeline's record store

use crate::error::{IngestError, IngestResult};
use crate::models::{SongCandidate, StoredSong};
use crate::services::record_store::RecordStore;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Record store over the `songs` table
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of stored songs
    pub async fn count(&self) -> IngestResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn ping(&self) -> IngestResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| IngestError::Connectivity(e.to_string()))
    }

    async fn exists(&self, title: &str, artist: &str) -> IngestResult<Vec<StoredSong>> {
        let rows = sqlx::query(
            r#"
            SELECT guid, title, artist, external_id, source_url
            FROM songs
            WHERE title = ? AND artist = ?
            ORDER BY created_at, external_id
            "#,
        )
        .bind(title)
        .bind(artist)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let guid_str: String = row.get("guid");
                Ok(StoredSong {
                    guid: Uuid::parse_str(&guid_str)
                        .map_err(|e| IngestError::Store(format!("Invalid guid {}: {}", guid_str, e)))?,
                    title: row.get("title"),
                    artist: row.get("artist"),
                    external_id: row.get("external_id"),
                    source_url: row.get("source_url"),
                })
            })
            .collect()
    }

    async fn insert(&self, candidate: &SongCandidate) -> IngestResult<()> {
        let attributes = &candidate.attributes;

        sqlx::query(
            r#"
            INSERT INTO songs (
                guid, title, artist, external_id, source_url,
                genre, tuning, instrument_type, difficulty, rating, votes, version,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&candidate.title)
        .bind(&candidate.artist)
        .bind(&candidate.external_id)
        .bind(&candidate.source_url)
        .bind(&attributes.genre)
        .bind(&attributes.tuning)
        .bind(&attributes.instrument_type)
        .bind(&attributes.difficulty)
        .bind(attributes.rating)
        .bind(attributes.votes.map(|v| v as i64))
        .bind(attributes.version.map(i64::from))
        .execute(&self.pool)
        .await?;

        tracing::debug!(key = %candidate.key(), "Song row inserted");
        Ok(())
    }
}
