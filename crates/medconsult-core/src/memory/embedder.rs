//! Embedder trait for text-to-vector conversion.
//!
//! Implementations (e.g., an OpenAI-compatible `/embeddings` client) live in
//! medconsult-infra.

use medconsult_types::error::EmbeddingError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait Embedder: Send + Sync {
    /// Embed one or more texts into vectors.
    ///
    /// Must return exactly one vector of `dimension()` floats per input, in
    /// input order, or fail. Partial results are never returned.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;

    /// The model name used for embeddings (e.g., "text-embedding-3-small").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
