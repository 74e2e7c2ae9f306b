//! Connection settings for an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use secrecy::SecretString;

use medconsult_types::config::GenerationConfig;

/// Configuration for an OpenAI-compatible LLM provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai", "ollama").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    /// API key; `None` makes every call fail as not configured.
    pub api_key: Option<SecretString>,
    /// Name of the variable the key should come from, for error messages.
    pub api_key_env: String,
    /// Default model identifier.
    pub model: String,
    /// Upper bound on a single completion call.
    pub timeout: Duration,
}

impl OpenAiCompatConfig {
    /// Build from the `[generation]` config section and an already-resolved key.
    pub fn from_generation(config: &GenerationConfig, api_key: Option<SecretString>) -> Self {
        Self {
            provider_name: config.provider_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`, 60 second timeout.
pub fn openai_defaults(api_key: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key: Some(SecretString::from(api_key.to_string())),
        api_key_env: "OPENAI_API_KEY".into(),
        model: model.into(),
        timeout: Duration::from_secs(60),
    }
}
