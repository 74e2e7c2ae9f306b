//! SQLite timeline repository implementation.
//!
//! Entries are append-only. Every query orders by `(created_at, id)`.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use medconsult_core::repository::timeline::TimelineRepository;
use medconsult_types::consultation::TimelineEntry;
use medconsult_types::error::RepositoryError;

use super::codec::{
    decode_vector, encode_vector, format_datetime, map_write_error, parse_datetime, parse_uuid,
    query_error, truncate_micros,
};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `TimelineRepository`.
#[derive(Clone)]
pub struct SqliteTimelineRepository {
    pool: DatabasePool,
}

impl SqliteTimelineRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct TimelineRow {
    id: String,
    consultation_id: String,
    user_query: String,
    model_response: String,
    insights: Option<String>,
    insight_embedding: Option<Vec<u8>>,
    created_at: String,
}

impl TimelineRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            consultation_id: row.try_get("consultation_id")?,
            user_query: row.try_get("user_query")?,
            model_response: row.try_get("model_response")?,
            insights: row.try_get("insights")?,
            insight_embedding: row.try_get("insight_embedding")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_entry(self) -> Result<TimelineEntry, RepositoryError> {
        Ok(TimelineEntry {
            id: parse_uuid(&self.id, "timeline entry id")?,
            consultation_id: parse_uuid(&self.consultation_id, "consultation_id")?,
            user_query: self.user_query,
            model_response: self.model_response,
            insights: self.insights,
            insight_embedding: decode_vector(self.insight_embedding)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn decode_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<TimelineEntry>, RepositoryError> {
    rows.iter()
        .map(|row| TimelineRow::from_row(row).map_err(query_error)?.into_entry())
        .collect()
}

impl TimelineRepository for SqliteTimelineRepository {
    async fn append_entry(&self, entry: &TimelineEntry) -> Result<TimelineEntry, RepositoryError> {
        let mut stored = entry.clone();
        stored.created_at = truncate_micros(entry.created_at);

        sqlx::query(
            "INSERT INTO timeline_entries
                (id, consultation_id, user_query, model_response, insights, insight_embedding, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.to_string())
        .bind(stored.consultation_id.to_string())
        .bind(&stored.user_query)
        .bind(&stored.model_response)
        .bind(stored.insights.as_deref())
        .bind(stored.insight_embedding.as_deref().map(encode_vector))
        .bind(format_datetime(&stored.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, || format!("timeline entry {} already exists", stored.id)))?;

        Ok(stored)
    }

    async fn recent_entries(
        &self,
        consultation_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<TimelineEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM timeline_entries WHERE consultation_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(consultation_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        decode_rows(&rows)
    }

    async fn entries_since(
        &self,
        consultation_id: &Uuid,
        after: DateTime<Utc>,
    ) -> Result<Vec<TimelineEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM timeline_entries WHERE consultation_id = ? AND created_at > ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(consultation_id.to_string())
        .bind(format_datetime(&after))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        decode_rows(&rows)
    }

    async fn count_since(
        &self,
        consultation_id: &Uuid,
        after: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM timeline_entries WHERE consultation_id = ? AND created_at > ?",
        )
        .bind(consultation_id.to_string())
        .bind(format_datetime(&after))
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let count: i64 = row.try_get("count").map_err(query_error)?;
        Ok(count.max(0) as u64)
    }

    async fn list_entries(&self, consultation_id: &Uuid) -> Result<Vec<TimelineEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM timeline_entries WHERE consultation_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(consultation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        decode_rows(&rows)
    }
}
