//! The bounded tool-call loop shared by the planning and execution agents.
//!
//! This is the only loop construct in the pipeline:
//! `repeat { infer -> if tool_calls: execute sequentially, append results,
//! continue } until no tool_calls`, capped at `max_iterations` rounds.
//! Tool calls within one round run sequentially in the order the model
//! requested them, and every result is appended to the transcript before
//! the next inference.

use tracing::{info, warn};

use weft_types::error::{Stage, WeftError};
use weft_types::llm::{
    CompletionRequest, CompletionResponse, ContentBlock, Message, MessageRole, StopReason,
};

use super::ToolSet;
use crate::llm::BoxLlmProvider;

/// One executed tool invocation, kept for id extraction and diagnostics.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub input: serde_json::Value,
    pub output: String,
    pub is_error: bool,
}

/// The result of a completed tool loop.
#[derive(Debug)]
pub struct ToolLoopOutcome {
    /// The model's final answer (contains no further tool calls).
    pub final_response: CompletionResponse,
    /// Every tool invocation across all rounds, in execution order.
    pub invocations: Vec<ToolInvocation>,
    /// Number of inference rounds used.
    pub rounds: usize,
}

/// Run the bounded infer->execute loop until the model stops calling tools.
///
/// The `request.messages` transcript is extended in place each round:
/// the assistant's tool-calling message, then a user message carrying the
/// tool results. Exceeding `max_iterations` aborts the turn.
pub async fn run_tool_loop(
    provider: &BoxLlmProvider,
    mut request: CompletionRequest,
    tools: &ToolSet,
    max_iterations: usize,
    stage: Stage,
) -> Result<ToolLoopOutcome, WeftError> {
    request.tools = tools.definitions();

    let mut invocations = Vec::new();

    for round in 1..=max_iterations {
        let response = provider
            .complete(&request)
            .await
            .map_err(|source| WeftError::Llm { stage, source })?;

        let tool_uses: Vec<(String, String, serde_json::Value)> = response
            .tool_uses()
            .into_iter()
            .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
            .collect();

        if response.stop_reason != StopReason::ToolUse || tool_uses.is_empty() {
            info!(stage = %stage, rounds = round, "tool loop finished");
            return Ok(ToolLoopOutcome {
                final_response: response,
                invocations,
                rounds: round,
            });
        }

        // Echo the assistant's tool-calling message into the transcript,
        // then execute each requested tool in order.
        request.messages.push(Message {
            role: MessageRole::Assistant,
            content: response.content.clone(),
        });

        let mut results = Vec::with_capacity(tool_uses.len());
        for (id, name, input) in tool_uses {
            let (output, is_error) = tools.dispatch(&name, input.clone()).await;
            if is_error {
                warn!(stage = %stage, tool = %name, "tool call failed; feeding error back");
            }
            invocations.push(ToolInvocation {
                name,
                input,
                output: output.clone(),
                is_error,
            });
            results.push(ContentBlock::ToolResult {
                tool_use_id: id,
                content: output,
                is_error,
            });
        }
        request.messages.push(Message::tool_results(results));
    }

    Err(WeftError::Configuration {
        stage,
        message: format!("tool loop exceeded the configured iteration cap ({max_iterations})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::llm::testing::{text_response, tool_call_response, ScriptedProvider};
    use crate::tool::{Tool, ToolError};

    fn base_request() -> CompletionRequest {
        CompletionRequest {
            model: "scripted".to_string(),
            messages: vec![Message::user("go")],
            system: None,
            max_tokens: 1024,
            temperature: None,
            stream: false,
            stop_sequences: None,
            tools: Vec::new(),
            tool_choice: None,
        }
    }

    struct Upper;

    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercases text."
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        async fn call(&self, input: serde_json::Value) -> Result<String, ToolError> {
            input["text"]
                .as_str()
                .map(str::to_uppercase)
                .ok_or_else(|| ToolError::InvalidInput("missing 'text'".to_string()))
        }
    }

    #[tokio::test]
    async fn test_loop_without_tool_calls_returns_immediately() {
        let provider = BoxLlmProvider::new(ScriptedProvider::new(vec![text_response("done")]));
        let tools = ToolSet::new().register(Upper);

        let outcome = run_tool_loop(&provider, base_request(), &tools, 4, Stage::Planning)
            .await
            .unwrap();
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.invocations.is_empty());
        assert_eq!(outcome.final_response.text(), "done");
    }

    #[tokio::test]
    async fn test_loop_executes_tool_then_finishes() {
        let provider = BoxLlmProvider::new(ScriptedProvider::new(vec![
            tool_call_response("upper", serde_json::json!({"text": "hi"})),
            text_response("HI it is"),
        ]));
        let tools = ToolSet::new().register(Upper);

        let outcome = run_tool_loop(&provider, base_request(), &tools, 4, Stage::Planning)
            .await
            .unwrap();
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.invocations.len(), 1);
        assert_eq!(outcome.invocations[0].output, "HI");
        assert!(!outcome.invocations[0].is_error);
    }

    #[tokio::test]
    async fn test_tool_failure_is_fed_back_not_fatal() {
        let provider = BoxLlmProvider::new(ScriptedProvider::new(vec![
            tool_call_response("upper", serde_json::json!({})),
            text_response("recovered"),
        ]));
        let tools = ToolSet::new().register(Upper);

        let outcome = run_tool_loop(&provider, base_request(), &tools, 4, Stage::Planning)
            .await
            .unwrap();
        assert!(outcome.invocations[0].is_error);
        assert!(outcome.invocations[0].output.contains("invalid input"));
        assert_eq!(outcome.final_response.text(), "recovered");
    }

    #[tokio::test]
    async fn test_iteration_cap_aborts_turn() {
        // Model asks for a tool every round, forever.
        let responses = (0..5)
            .map(|_| tool_call_response("upper", serde_json::json!({"text": "x"})))
            .collect();
        let provider = BoxLlmProvider::new(ScriptedProvider::new(responses));
        let tools = ToolSet::new().register(Upper);

        let err = run_tool_loop(&provider, base_request(), &tools, 3, Stage::Execution)
            .await
            .unwrap_err();
        match err {
            WeftError::Configuration { stage, message } => {
                assert_eq!(stage, Stage::Execution);
                assert!(message.contains("iteration cap"));
            }
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }
}
