//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use medconsult_types::error::ConsultError;

use super::response::{ApiResponse, new_request_id};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors surfaced by the core services.
    Consult(ConsultError),
    /// Malformed path or query input.
    Validation(String),
}

impl From<ConsultError> for AppError {
    fn from(e: ConsultError) -> Self {
        AppError::Consult(e)
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Consult(e) => {
                let status = match e {
                    ConsultError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
                    ConsultError::Validation(_) => StatusCode::BAD_REQUEST,
                    ConsultError::ProviderUnavailable(_)
                    | ConsultError::ProviderMalformedOutput(_) => StatusCode::BAD_GATEWAY,
                    ConsultError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.code())
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Consult(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        };

        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        let body = ApiResponse::error(code, &message, new_request_id(), 0);
        (status, Json(body)).into_response()
    }
}
