//! Pipeline configuration.
//!
//! One [`PipelineConfig`] is supplied per turn invocation. API keys are
//! wrapped in [`secrecy::SecretString`] so they never appear in Debug output
//! or tracing logs. The LLM key is required by every LLM-backed station; the
//! platform key only once execution is reached.

use secrecy::SecretString;
use serde::Deserialize;

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Anthropic API key. Fatal if absent for any LLM-backed station.
    #[serde(default)]
    pub anthropic_api_key: Option<SecretString>,
    /// Automation platform API key. Fatal only once execution is reached.
    #[serde(default)]
    pub platform_api_key: Option<SecretString>,
    /// Automation platform base URL.
    #[serde(default = "default_platform_base_url")]
    pub platform_base_url: String,
    /// Model identifier for all agent calls.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum output tokens per LLM call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Requirements confidence the router demands before planning starts.
    /// Strict greater-than: a status at exactly this value stays in chat.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Cap on infer->tool rounds within one agent turn.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

fn default_platform_base_url() -> String {
    "http://localhost:5678".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_confidence_threshold() -> f64 {
    0.8
}

fn default_max_tool_iterations() -> usize {
    8
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            platform_api_key: None,
            platform_base_url: default_platform_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            confidence_threshold: default_confidence_threshold(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.platform_base_url, "http://localhost:5678");
        assert_eq!(config.max_tokens, 4096);
        assert!((config.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.max_tool_iterations, 8);
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn test_deserialize_partial_toml_fills_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
anthropic_api_key = "sk-test-not-real"
model = "claude-haiku-4-5"
"#,
        )
        .unwrap();
        assert_eq!(config.model, "claude-haiku-4-5");
        assert_eq!(config.max_tool_iterations, 8);
        assert_eq!(
            config.anthropic_api_key.unwrap().expose_secret(),
            "sk-test-not-real"
        );
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let config: PipelineConfig =
            toml::from_str(r#"anthropic_api_key = "sk-super-secret""#).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-super-secret"));
    }
}
