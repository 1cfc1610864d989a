//! The tool contract: named, schema-constrained functions an agent can
//! invoke mid-turn.
//!
//! Tool failures are never fatal. [`ToolSet::dispatch`] converts every
//! [`ToolError`] into agent-visible text so the failing agent can reason
//! about the failure in its own next inference instead of aborting the turn.

pub mod tool_loop;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use weft_types::llm::ToolDefinition;

/// Errors from tool execution.
///
/// These are surfaced to the calling agent as text, not thrown up the
/// pipeline.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The input did not match the tool's schema.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tool's backing call failed (platform API, network, ...).
    #[error("execution failed: {0}")]
    Execution(String),

    /// No tool with the requested name is registered.
    #[error("unknown tool: '{0}'")]
    UnknownTool(String),
}

/// A named, schema-constrained function an agent can invoke mid-turn.
///
/// Uses RPITIT like all async traits in this project; `ToolSet` erases the
/// type through [`ToolDyn`].
pub trait Tool: Send + Sync {
    /// Tool name as offered to the model.
    fn name(&self) -> &str;

    /// One-paragraph description for the model.
    fn description(&self) -> &str;

    /// JSON Schema constraining the tool input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool. The returned text is fed back to the model.
    fn call(
        &self,
        input: serde_json::Value,
    ) -> impl Future<Output = Result<String, ToolError>> + Send;
}

/// Object-safe version of [`Tool`] with a boxed future.
pub trait ToolDyn: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> serde_json::Value;

    fn call_boxed(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>>;
}

/// Blanket implementation: any `Tool` automatically implements `ToolDyn`.
impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn input_schema(&self) -> serde_json::Value {
        Tool::input_schema(self)
    }

    fn call_boxed(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        Box::pin(self.call(input))
    }
}

/// An ordered registry of tools offered to one agent.
#[derive(Default)]
pub struct ToolSet {
    tools: Vec<Box<dyn ToolDyn>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Order is preserved in the definitions sent to the model.
    pub fn register<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions in registration order, for the completion request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name, converting any failure to agent-visible text.
    ///
    /// Returns `(text, is_error)`. The text is what the model sees either way.
    pub async fn dispatch(&self, name: &str, input: serde_json::Value) -> (String, bool) {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == name) else {
            let err = ToolError::UnknownTool(name.to_string());
            return (format!("tool call failed: {err}"), true);
        };

        match tool.call_boxed(input).await {
            Ok(output) => (output, false),
            Err(err) => (format!("tool '{name}' failed: {err}"), true),
        }
    }
}
