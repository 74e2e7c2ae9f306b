//! SQLite vitals repository implementation.

use sqlx::Row;
use uuid::Uuid;

use medconsult_core::repository::vitals::VitalsRepository;
use medconsult_types::error::RepositoryError;
use medconsult_types::vitals::{VitalsEntry, VitalsQuery};

use super::codec::{
    format_datetime, map_write_error, parse_datetime, parse_optional_uuid, parse_uuid, query_error,
    truncate_micros,
};
use super::pool::DatabasePool;

/// SQLite-backed implementation of `VitalsRepository`.
#[derive(Clone)]
pub struct SqliteVitalsRepository {
    pool: DatabasePool,
}

impl SqliteVitalsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn row_to_vital(row: &sqlx::sqlite::SqliteRow) -> Result<VitalsEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_error)?;
    let user_id: String = row.try_get("user_id").map_err(query_error)?;
    let consultation_id: Option<String> = row.try_get("consultation_id").map_err(query_error)?;
    let recorded_at: String = row.try_get("recorded_at").map_err(query_error)?;

    Ok(VitalsEntry {
        id: parse_uuid(&id, "vitals id")?,
        user_id: parse_uuid(&user_id, "user_id")?,
        metric_name: row.try_get("metric_name").map_err(query_error)?,
        metric_value: row.try_get("metric_value").map_err(query_error)?,
        consultation_id: parse_optional_uuid(consultation_id.as_deref(), "consultation_id")?,
        recorded_at: parse_datetime(&recorded_at)?,
    })
}

impl VitalsRepository for SqliteVitalsRepository {
    async fn record_vital(&self, entry: &VitalsEntry) -> Result<VitalsEntry, RepositoryError> {
        let mut stored = entry.clone();
        stored.recorded_at = truncate_micros(entry.recorded_at);

        sqlx::query(
            "INSERT INTO vitals (id, user_id, metric_name, metric_value, consultation_id, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.to_string())
        .bind(stored.user_id.to_string())
        .bind(&stored.metric_name)
        .bind(stored.metric_value)
        .bind(stored.consultation_id.map(|id| id.to_string()))
        .bind(format_datetime(&stored.recorded_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, || format!("vitals entry {} already exists", stored.id)))?;

        Ok(stored)
    }

    async fn query_vitals(
        &self,
        user_id: &Uuid,
        query: &VitalsQuery,
    ) -> Result<Vec<VitalsEntry>, RepositoryError> {
        let from = query.from.as_ref().map(format_datetime);
        let to = query.to.as_ref().map(format_datetime);

        let rows = sqlx::query(
            "SELECT * FROM vitals
             WHERE user_id = ?
               AND (? IS NULL OR metric_name = ?)
               AND (? IS NULL OR recorded_at >= ?)
               AND (? IS NULL OR recorded_at <= ?)
             ORDER BY recorded_at ASC, id ASC",
        )
        .bind(user_id.to_string())
        .bind(query.metric.as_deref())
        .bind(query.metric.as_deref())
        .bind(from.as_deref())
        .bind(from.as_deref())
        .bind(to.as_deref())
        .bind(to.as_deref())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter().map(row_to_vital).collect()
    }
}
