//! Generation provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`LlmProvider`]
//! trait defined in `medconsult-core`, plus a factory that builds the boxed
//! provider from the `[generation]` config section.
//!
//! [`LlmProvider`]: medconsult_core::llm::provider::LlmProvider

pub mod openai_compat;

use medconsult_core::llm::box_provider::BoxLlmProvider;
use medconsult_types::config::GenerationConfig;

use crate::config::read_api_key;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from the `[generation]` config section.
///
/// The API key is read from `config.api_key_env`. A missing key does not
/// fail here; the provider reports it on first use so that read-only
/// surfaces keep working.
pub fn create_provider(config: &GenerationConfig) -> BoxLlmProvider {
    let api_key = read_api_key(&config.api_key_env);
    if api_key.is_none() {
        tracing::warn!(
            provider = %config.provider_name,
            env_var = %config.api_key_env,
            "no API key for generation provider; consultation turns will fail"
        );
    }
    let provider =
        OpenAiCompatibleProvider::new(OpenAiCompatConfig::from_generation(config, api_key));
    BoxLlmProvider::new(provider)
}
