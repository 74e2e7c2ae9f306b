//! SQLite condition repository implementation.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use medconsult_core::repository::condition::ConditionRepository;
use medconsult_core::vector::rank_by_distance;
use medconsult_types::condition::{Condition, ConditionType, ConditionUpdate, SourceType};
use medconsult_types::error::RepositoryError;

use super::codec::{
    decode_vector, encode_vector, format_date, format_datetime, map_write_error, parse_date,
    parse_datetime, parse_optional_uuid, parse_uuid, query_error, truncate_micros,
};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConditionRepository`.
#[derive(Clone)]
pub struct SqliteConditionRepository {
    pool: DatabasePool,
}

impl SqliteConditionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ConditionRow {
    id: String,
    user_id: String,
    source_type: String,
    consultation_id: Option<String>,
    condition_type: String,
    condition_name: String,
    icd_code: Option<String>,
    diagnosis_date: Option<String>,
    is_active: bool,
    notes: String,
    certainty: Option<f64>,
    embedding: Option<Vec<u8>>,
    created_at: String,
    updated_at: String,
}

impl ConditionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            source_type: row.try_get("source_type")?,
            consultation_id: row.try_get("consultation_id")?,
            condition_type: row.try_get("condition_type")?,
            condition_name: row.try_get("condition_name")?,
            icd_code: row.try_get("icd_code")?,
            diagnosis_date: row.try_get("diagnosis_date")?,
            is_active: row.try_get("is_active")?,
            notes: row.try_get("notes")?,
            certainty: row.try_get("certainty")?,
            embedding: row.try_get("embedding")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_condition(self) -> Result<Condition, RepositoryError> {
        let source_type: SourceType = self.source_type.parse().map_err(RepositoryError::Query)?;
        let condition_type: ConditionType =
            self.condition_type.parse().map_err(RepositoryError::Query)?;

        Ok(Condition {
            id: parse_uuid(&self.id, "condition id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            source_type,
            consultation_id: parse_optional_uuid(self.consultation_id.as_deref(), "consultation_id")?,
            condition_type,
            condition_name: self.condition_name,
            icd_code: self.icd_code,
            diagnosis_date: self.diagnosis_date.as_deref().map(parse_date).transpose()?,
            is_active: self.is_active,
            notes: self.notes,
            certainty: self.certainty,
            embedding: decode_vector(self.embedding)?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn decode_rows(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Condition>, RepositoryError> {
    rows.iter()
        .map(|row| ConditionRow::from_row(row).map_err(query_error)?.into_condition())
        .collect()
}

impl ConditionRepository for SqliteConditionRepository {
    async fn create_condition(&self, condition: &Condition) -> Result<Condition, RepositoryError> {
        condition.validate().map_err(RepositoryError::Conflict)?;

        let mut stored = condition.clone();
        stored.created_at = truncate_micros(condition.created_at);
        stored.updated_at = truncate_micros(condition.updated_at);

        sqlx::query(
            "INSERT INTO conditions
                (id, user_id, source_type, consultation_id, condition_type, condition_name,
                 icd_code, diagnosis_date, is_active, notes, certainty, embedding,
                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.to_string())
        .bind(stored.user_id.to_string())
        .bind(stored.source_type.to_string())
        .bind(stored.consultation_id.map(|id| id.to_string()))
        .bind(stored.condition_type.to_string())
        .bind(&stored.condition_name)
        .bind(stored.icd_code.as_deref())
        .bind(stored.diagnosis_date.as_ref().map(format_date))
        .bind(stored.is_active)
        .bind(&stored.notes)
        .bind(stored.certainty)
        .bind(stored.embedding.as_deref().map(encode_vector))
        .bind(format_datetime(&stored.created_at))
        .bind(format_datetime(&stored.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, || format!("condition {} already exists", stored.id)))?;

        Ok(stored)
    }

    async fn get_condition(&self, id: &Uuid) -> Result<Option<Condition>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conditions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(
                ConditionRow::from_row(&row)
                    .map_err(query_error)?
                    .into_condition()?,
            )),
            None => Ok(None),
        }
    }

    async fn list_conditions(
        &self,
        user_id: &Uuid,
        active_only: bool,
    ) -> Result<Vec<Condition>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM conditions WHERE user_id = ? AND (? = 0 OR is_active = 1)
             ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id.to_string())
        .bind(active_only)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        decode_rows(&rows)
    }

    async fn update_condition(
        &self,
        id: &Uuid,
        update: &ConditionUpdate,
    ) -> Result<Condition, RepositoryError> {
        let now = truncate_micros(Utc::now());
        let result = sqlx::query(
            "UPDATE conditions
             SET is_active = ?, notes = ?, icd_code = COALESCE(?, icd_code), updated_at = ?
             WHERE id = ?",
        )
        .bind(update.is_active)
        .bind(&update.notes)
        .bind(update.icd_code.as_deref())
        .bind(format_datetime(&now))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_condition(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn nearest_conditions(
        &self,
        user_id: &Uuid,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> Result<Vec<(Condition, f32)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM conditions WHERE user_id = ? AND embedding IS NOT NULL",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let candidates = decode_rows(&rows)?;
        Ok(rank_by_distance(query, candidates, k, max_distance))
    }
}
