//! LLM provider implementations.

pub mod anthropic;

use std::sync::Arc;

use secrecy::SecretString;

use weft_core::llm::BoxLlmProvider;
use weft_types::config::PipelineConfig;
use weft_types::error::{Stage, WeftError};

use anthropic::AnthropicProvider;

/// Build the type-erased provider from configuration.
///
/// Fatal when the LLM key is missing: every LLM-backed station needs it, so
/// there is no point starting a turn without one.
pub fn build_provider(config: &PipelineConfig) -> Result<Arc<BoxLlmProvider>, WeftError> {
    let api_key: SecretString = config
        .anthropic_api_key
        .clone()
        .ok_or_else(|| WeftError::Configuration {
            stage: Stage::Enrichment,
            message: "Anthropic API key missing (set WEFT_ANTHROPIC_API_KEY)".to_string(),
        })?;

    let provider = AnthropicProvider::new(api_key, config.model.clone());
    Ok(Arc::new(BoxLlmProvider::new(provider)))
}
