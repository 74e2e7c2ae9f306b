//! SQLite consultation repository implementation.
//!
//! `updated_at` is written only on creation and by `update_summary`, so it
//! keeps meaning "end of the last summarized window". Listing orders by the
//! later of that and the newest timeline turn.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use medconsult_core::repository::consultation::ConsultationRepository;
use medconsult_core::vector::rank_by_distance;
use medconsult_types::consultation::Consultation;
use medconsult_types::error::RepositoryError;

use super::codec::{
    decode_vector, encode_vector, format_datetime, map_write_error, parse_datetime,
    parse_optional_uuid, parse_uuid, query_error, truncate_micros,
};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConsultationRepository`.
#[derive(Clone)]
pub struct SqliteConsultationRepository {
    pool: DatabasePool,
}

impl SqliteConsultationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to `Consultation`.
struct ConsultationRow {
    id: String,
    user_id: String,
    heading: String,
    reference: Option<String>,
    summary: String,
    summary_embedding: Option<Vec<u8>>,
    last_condition_check_at: String,
    created_at: String,
    updated_at: String,
}

impl ConsultationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            heading: row.try_get("heading")?,
            reference: row.try_get("reference")?,
            summary: row.try_get("summary")?,
            summary_embedding: row.try_get("summary_embedding")?,
            last_condition_check_at: row.try_get("last_condition_check_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_consultation(self) -> Result<Consultation, RepositoryError> {
        Ok(Consultation {
            id: parse_uuid(&self.id, "consultation id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            heading: self.heading,
            reference: parse_optional_uuid(self.reference.as_deref(), "reference")?,
            summary: self.summary,
            summary_embedding: decode_vector(self.summary_embedding)?,
            last_condition_check_at: parse_datetime(&self.last_condition_check_at)?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn decode_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Consultation>, RepositoryError> {
    rows.iter()
        .map(|row| {
            ConsultationRow::from_row(row)
                .map_err(query_error)?
                .into_consultation()
        })
        .collect()
}

impl ConsultationRepository for SqliteConsultationRepository {
    async fn create_consultation(
        &self,
        consultation: &Consultation,
    ) -> Result<Consultation, RepositoryError> {
        let mut stored = consultation.clone();
        stored.last_condition_check_at = truncate_micros(consultation.last_condition_check_at);
        stored.created_at = truncate_micros(consultation.created_at);
        stored.updated_at = truncate_micros(consultation.updated_at);

        sqlx::query(
            "INSERT INTO consultations
                (id, user_id, heading, reference, summary, summary_embedding,
                 last_condition_check_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.to_string())
        .bind(stored.user_id.to_string())
        .bind(&stored.heading)
        .bind(stored.reference.map(|r| r.to_string()))
        .bind(&stored.summary)
        .bind(stored.summary_embedding.as_deref().map(encode_vector))
        .bind(format_datetime(&stored.last_condition_check_at))
        .bind(format_datetime(&stored.created_at))
        .bind(format_datetime(&stored.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, || format!("consultation {} already exists", stored.id)))?;

        Ok(stored)
    }

    async fn get_consultation(&self, id: &Uuid) -> Result<Option<Consultation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM consultations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(
                ConsultationRow::from_row(&row)
                    .map_err(query_error)?
                    .into_consultation()?,
            )),
            None => Ok(None),
        }
    }

    async fn list_consultations(
        &self,
        user_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<Consultation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT c.*,
                    MAX(c.updated_at, COALESCE(
                        (SELECT MAX(t.created_at) FROM timeline_entries t
                         WHERE t.consultation_id = c.id),
                        c.updated_at)) AS last_activity
             FROM consultations c WHERE c.user_id = ?
             ORDER BY last_activity DESC, c.id DESC LIMIT ?",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        decode_rows(&rows)
    }

    async fn update_summary(
        &self,
        id: &Uuid,
        summary: &str,
        embedding: &[f32],
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE consultations SET summary = ?, summary_embedding = ?, updated_at = ? WHERE id = ?",
        )
        .bind(summary)
        .bind(encode_vector(embedding))
        .bind(format_datetime(&at))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn advance_condition_check(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let row = sqlx::query(
            "UPDATE consultations
             SET last_condition_check_at = MAX(last_condition_check_at, ?)
             WHERE id = ?
             RETURNING last_condition_check_at",
        )
        .bind(format_datetime(&at))
        .bind(id.to_string())
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(query_error)?
        .ok_or(RepositoryError::NotFound)?;

        let stored: String = row.try_get("last_condition_check_at").map_err(query_error)?;
        parse_datetime(&stored)
    }

    async fn nearest_consultations(
        &self,
        user_id: &Uuid,
        exclude_id: Option<Uuid>,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> Result<Vec<(Consultation, f32)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM consultations
             WHERE user_id = ? AND summary_embedding IS NOT NULL AND (? IS NULL OR id != ?)",
        )
        .bind(user_id.to_string())
        .bind(exclude_id.map(|id| id.to_string()))
        .bind(exclude_id.map(|id| id.to_string()))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let candidates = decode_rows(&rows)?;
        Ok(rank_by_distance(query, candidates, k, max_distance))
    }
}
