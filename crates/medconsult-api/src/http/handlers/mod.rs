//! HTTP request handlers for the REST API.

pub mod conditions;
pub mod consultations;
pub mod users;
pub mod vitals;

use uuid::Uuid;

use crate::http::error::AppError;

/// Parse a path id, reporting a malformed id as a validation error.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid {what} id: '{raw}'")))
}
