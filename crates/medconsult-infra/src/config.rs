//! Configuration loader for MedConsult.
//!
//! Reads `config.toml` from the data directory (`~/.medconsult/` in
//! production) and deserializes it into [`MedConsultConfig`]. Falls back to
//! defaults when the file is missing or malformed. API keys never live in
//! the file: each provider section names the environment variable to read.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use medconsult_types::config::MedConsultConfig;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `MEDCONSULT_DATA_DIR` environment variable
/// 2. `~/.medconsult`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MEDCONSULT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".medconsult");
    }

    PathBuf::from(".medconsult")
}

/// SQLite URL for the database inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("medconsult.db").display())
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`MedConsultConfig::default()`].
/// - Unreadable or unparsable file: logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> MedConsultConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return MedConsultConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return MedConsultConfig::default();
        }
    };

    match toml::from_str::<MedConsultConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            MedConsultConfig::default()
        }
    }
}

/// Read an API key from the named environment variable.
///
/// Unset, empty, or non-Unicode values count as missing.
pub fn read_api_key(env_var: &str) -> Option<SecretString> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Some(SecretString::from(value.trim().to_string())),
        Ok(_) => None,
        Err(_) => {
            tracing::debug!(env_var, "API key environment variable not set");
            None
        }
    }
}
