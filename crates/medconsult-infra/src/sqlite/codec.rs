//! Column encodings shared by the SQLite repositories.
//!
//! Timestamps are fixed-width RFC 3339 strings with microsecond precision
//! and a `Z` suffix, so string comparison in SQL is chronological.
//! Vectors are little-endian `f32` BLOBs.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use medconsult_types::error::RepositoryError;
use uuid::Uuid;

/// Drop sub-microsecond precision so values survive a storage round trip.
pub fn truncate_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(6)
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime '{s}': {e}")))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Query(format!("invalid date '{s}': {e}")))
}

pub fn parse_uuid(s: &str, what: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what}: {e}")))
}

pub fn parse_optional_uuid(s: Option<&str>, what: &str) -> Result<Option<Uuid>, RepositoryError> {
    s.map(|s| parse_uuid(s, what)).transpose()
}

pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for f in vector {
        blob.extend_from_slice(&f.to_le_bytes());
    }
    blob
}

pub fn decode_vector(blob: Option<Vec<u8>>) -> Result<Option<Vec<f32>>, RepositoryError> {
    let Some(blob) = blob else {
        return Ok(None);
    };
    if blob.len() % 4 != 0 {
        return Err(RepositoryError::Query(format!(
            "vector blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    Ok(Some(
        blob.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    ))
}

/// Map a sqlx error, turning UNIQUE violations into `Conflict`.
pub fn map_write_error(e: sqlx::Error, conflict: impl FnOnce() -> String) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.message().contains("UNIQUE") {
            return RepositoryError::Conflict(conflict());
        }
        if db_err.message().contains("FOREIGN KEY") {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Query(e.to_string())
}

pub fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}
