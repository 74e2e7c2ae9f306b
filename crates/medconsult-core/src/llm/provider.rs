//! LlmProvider trait definition.
//!
//! This is the core abstraction that all generation providers implement.

use medconsult_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for generation provider backends (OpenAI-compatible endpoints, etc.).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in medconsult-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    ///
    /// When `request.output_config` is set the provider must constrain the
    /// output to that JSON schema or fail.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
