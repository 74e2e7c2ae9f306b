//! Configuration types for MedConsult.
//!
//! `MedConsultConfig` represents `config.toml` in the data directory. Every
//! section and field has a default, so an empty or partial file is valid.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedConsultConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Similarity search limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Records must score strictly above this cosine similarity.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Over-fetch bound per record kind before merging.
    #[serde(default = "default_per_kind_limit")]
    pub per_kind_limit: usize,
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,
}

fn default_similarity_threshold() -> f32 {
    0.50
}

fn default_per_kind_limit() -> usize {
    20
}

fn default_max_context_chunks() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            per_kind_limit: default_per_kind_limit(),
            max_context_chunks: default_max_context_chunks(),
        }
    }
}

impl RetrievalConfig {
    /// Largest cosine distance still considered relevant (exclusive).
    pub fn max_distance(&self) -> f32 {
        1.0 - self.similarity_threshold
    }
}

/// Consolidation and reconciliation triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_summary_update_threshold")]
    pub summary_update_threshold: usize,
    #[serde(default = "default_condition_check_threshold")]
    pub condition_check_threshold: usize,
    /// Timeline turns replayed into the consultation prompt.
    #[serde(default = "default_recent_turns")]
    pub recent_turns: u32,
}

fn default_summary_update_threshold() -> usize {
    10
}

fn default_condition_check_threshold() -> usize {
    5
}

fn default_recent_turns() -> u32 {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            summary_update_threshold: default_summary_update_threshold(),
            condition_check_threshold: default_condition_check_threshold(),
            recent_turns: default_recent_turns(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_provider_name")]
    pub provider_name: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f64 {
    0.3
}

fn default_generation_timeout_secs() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            base_url: default_openai_base_url(),
            model: default_generation_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

/// OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}
