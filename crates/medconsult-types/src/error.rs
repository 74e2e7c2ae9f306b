use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in medconsult-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding provider returned {returned} vectors for {requested} inputs")]
    IncompleteResponse { requested: usize, returned: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding response could not be parsed: {0}")]
    Deserialization(String),
}

/// Error taxonomy surfaced by the consultation pipeline.
///
/// "Not enough new entries" is deliberately absent: consolidation and
/// reconciliation report it through their outcome types, not as an error.
#[derive(Debug, Error)]
pub enum ConsultError {
    /// Embedding or generation endpoint unreachable, misconfigured, or timed out.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Generation output failed JSON parsing or schema validation.
    #[error("provider returned malformed output: {0}")]
    ProviderMalformedOutput(String),

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: &'static str, id: String },

    /// Caller-supplied input was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ConsultError {
    /// Shorthand for a missing record.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        ConsultError::RecordNotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code, shared by the HTTP layer and error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ConsultError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            ConsultError::ProviderMalformedOutput(_) => "PROVIDER_MALFORMED_OUTPUT",
            ConsultError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            ConsultError::Validation(_) => "VALIDATION_ERROR",
            ConsultError::Repository(_) => "STORAGE_ERROR",
        }
    }
}

impl From<LlmError> for ConsultError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Deserialization(msg) | LlmError::InvalidJson(msg) => {
                ConsultError::ProviderMalformedOutput(msg)
            }
            other => ConsultError::ProviderUnavailable(other.to_string()),
        }
    }
}

impl From<EmbeddingError> for ConsultError {
    fn from(e: EmbeddingError) -> Self {
        ConsultError::ProviderUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_llm_deserialization_maps_to_malformed_output() {
        let err: ConsultError = LlmError::Deserialization("bad json".to_string()).into();
        assert!(matches!(err, ConsultError::ProviderMalformedOutput(_)));
        assert_eq!(err.code(), "PROVIDER_MALFORMED_OUTPUT");
    }

    #[test]
    fn test_llm_timeout_maps_to_unavailable() {
        let err: ConsultError = LlmError::Timeout { seconds: 30 }.into();
        assert!(matches!(err, ConsultError::ProviderUnavailable(_)));
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_embedding_error_maps_to_unavailable() {
        let err: ConsultError = EmbeddingError::DimensionMismatch {
            expected: 768,
            actual: 384,
        }
        .into();
        assert!(matches!(err, ConsultError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = ConsultError::not_found("consultation", "abc");
        assert_eq!(err.to_string(), "consultation not found: abc");
        assert_eq!(err.code(), "RECORD_NOT_FOUND");
    }
}
