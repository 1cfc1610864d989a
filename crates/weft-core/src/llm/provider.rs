//! LlmProvider trait definition.
//!
//! This is the core abstraction every LLM backend implements. Uses RPITIT
//! for `complete`, and `Pin<Box<dyn Stream>>` for `stream` (streams need to
//! be object-safe for the BoxLlmProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use weft_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StreamEvent,
};

/// Trait for LLM provider backends.
///
/// Requests may carry tool definitions; a provider that reports
/// `tool_calling` in its capabilities must surface `ToolUse` content blocks
/// in responses and accept `ToolResult` blocks in follow-up messages.
///
/// Implementations live in weft-infra (e.g. `AnthropicProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// What this provider supports (streaming, tool calling, limits).
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// Returns a boxed stream (not RPITIT) because streams need to be
    /// object-safe for the `BoxLlmProvider` wrapper.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
