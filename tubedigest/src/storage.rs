use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// A stored summary. At most one exists per (owner, video_url).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SummaryRecord {
    pub id: i64,
    #[serde(skip_serializing)]
    pub owner_id: i64,
    pub video_url: String,
    pub title: String,
    pub summary: String,
    pub thumbnail_url: String,
    pub duration: String,
    pub created_at: DateTime<Utc>,
}

/// Fields written on every upsert.
#[derive(Debug, Clone)]
pub struct SummaryContent {
    pub title: String,
    pub summary: String,
    pub thumbnail_url: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub total_summaries: i64,
    pub recent_summaries: i64,
    pub last_summary: Option<DateTime<Utc>>,
}

const RECORD_COLUMNS: &str =
    "id, owner_id, video_url, title, summary, thumbnail_url, duration, created_at";

/// Ensure the summary table exists. Idempotent, safe to call at startup.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    info!("storage: ensuring DB schema (CREATE TABLE IF NOT EXISTS ...)");

    let stmts = [
        r#"
        CREATE TABLE IF NOT EXISTS video_summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            video_url TEXT NOT NULL,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            thumbnail_url TEXT NOT NULL DEFAULT '',
            duration TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            UNIQUE(owner_id, video_url)
        );
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_video_summaries_owner_created
            ON video_summaries (owner_id, created_at);
        "#,
    ];

    for s in &stmts {
        sqlx::query(s)
            .execute(pool)
            .await
            .context("failed to ensure schema")?;
    }

    Ok(())
}

/// Summary records, always filtered by owner.
#[derive(Clone)]
pub struct SummaryStore {
    pool: SqlitePool,
}

impl SummaryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create or update the record for (owner, video_url) in one statement.
    /// `created_at` is only written on insert; id and creation time survive updates.
    pub async fn upsert(
        &self,
        owner_id: i64,
        video_url: &str,
        content: &SummaryContent,
        now: DateTime<Utc>,
    ) -> Result<SummaryRecord> {
        let sql = format!(
            r#"
            INSERT INTO video_summaries
                (owner_id, video_url, title, summary, thumbnail_url, duration, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner_id, video_url) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                thumbnail_url = excluded.thumbnail_url,
                duration = excluded.duration
            RETURNING {}
            "#,
            RECORD_COLUMNS
        );

        let record = sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(owner_id)
            .bind(video_url)
            .bind(&content.title)
            .bind(&content.summary)
            .bind(&content.thumbnail_url)
            .bind(&content.duration)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .context("failed to upsert summary")?;

        debug!(id = record.id, owner_id, %video_url, "stored summary");
        Ok(record)
    }

    /// All records for the owner, newest first.
    pub async fn list(&self, owner_id: i64) -> Result<Vec<SummaryRecord>> {
        let sql = format!(
            "SELECT {} FROM video_summaries WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to list summaries")
    }

    /// Records created at or after `since`, newest first.
    pub async fn list_since(&self, owner_id: i64, since: DateTime<Utc>) -> Result<Vec<SummaryRecord>> {
        let sql = format!(
            "SELECT {} FROM video_summaries WHERE owner_id = ? AND created_at >= ? \
             ORDER BY created_at DESC, id DESC",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(owner_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .context("failed to list recent summaries")
    }

    pub async fn get(&self, owner_id: i64, id: i64) -> Result<Option<SummaryRecord>> {
        let sql = format!(
            "SELECT {} FROM video_summaries WHERE owner_id = ? AND id = ?",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(owner_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch summary")
    }

    /// Returns true if a record was removed.
    pub async fn delete(&self, owner_id: i64, id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM video_summaries WHERE owner_id = ? AND id = ?")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete summary")?;
        Ok(res.rows_affected() > 0)
    }

    /// Delete every record of the owner, returning how many were removed.
    pub async fn clear(&self, owner_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM video_summaries WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .context("failed to clear summaries")?;
        info!(owner_id, removed = res.rows_affected(), "cleared summary history");
        Ok(res.rows_affected())
    }

    pub async fn stats(&self, owner_id: i64, recent_since: DateTime<Utc>) -> Result<SummaryStats> {
        let total_summaries = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM video_summaries WHERE owner_id = ?",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to count summaries")?;

        let recent_summaries = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM video_summaries WHERE owner_id = ? AND created_at >= ?",
        )
        .bind(owner_id)
        .bind(recent_since)
        .fetch_one(&self.pool)
        .await
        .context("failed to count recent summaries")?;

        let last_summary = sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM video_summaries WHERE owner_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch last summary time")?;

        Ok(SummaryStats {
            total_summaries,
            recent_summaries,
            last_summary,
        })
    }
}
