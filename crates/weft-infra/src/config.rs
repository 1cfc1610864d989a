//! Pipeline configuration loader.
//!
//! Reads `weft.toml` from the given directory and deserializes it into
//! [`PipelineConfig`], then applies environment overrides. Falls back to
//! defaults when the file is missing or malformed -- a broken config file
//! should degrade, not abort, since the keys can still arrive via the
//! environment.
//!
//! Environment variables: `WEFT_ANTHROPIC_API_KEY`, `WEFT_PLATFORM_API_KEY`,
//! `WEFT_PLATFORM_URL`, `WEFT_MODEL`.

use std::path::Path;

use secrecy::SecretString;
use weft_types::config::PipelineConfig;

/// Load configuration from `{dir}/weft.toml` plus environment overrides.
///
/// - Missing file: defaults.
/// - Unreadable or unparsable file: logs a warning, then defaults.
/// - Environment variables override whatever the file provided.
pub async fn load_pipeline_config(dir: &Path) -> PipelineConfig {
    let config_path = dir.join("weft.toml");

    let mut config = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => match toml::from_str::<PipelineConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    "Failed to parse {}: {err}, using defaults",
                    config_path.display()
                );
                PipelineConfig::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No weft.toml found at {}, using defaults",
                config_path.display()
            );
            PipelineConfig::default()
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            PipelineConfig::default()
        }
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Apply environment overrides through an injectable lookup.
fn apply_env_overrides(config: &mut PipelineConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(key) = lookup("WEFT_ANTHROPIC_API_KEY") {
        config.anthropic_api_key = Some(SecretString::from(key));
    }
    if let Some(key) = lookup("WEFT_PLATFORM_API_KEY") {
        config.platform_api_key = Some(SecretString::from(key));
    }
    if let Some(url) = lookup("WEFT_PLATFORM_URL") {
        config.platform_base_url = url;
    }
    if let Some(model) = lookup("WEFT_MODEL") {
        config.model = model;
    }
}
