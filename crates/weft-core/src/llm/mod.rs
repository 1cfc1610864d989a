//! LLM provider abstraction.
//!
//! [`provider::LlmProvider`] is the port every backend implements;
//! [`box_provider::BoxLlmProvider`] is the type-erased wrapper the agents
//! hold so backends can be chosen at runtime.

pub mod box_provider;
pub mod provider;

pub use box_provider::BoxLlmProvider;
pub use provider::LlmProvider;

/// Scripted provider shared by agent, loop, and scenario tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::pin::Pin;
    use std::sync::Mutex;

    use futures_util::Stream;

    use weft_types::llm::{
        CompletionRequest, CompletionResponse, ContentBlock, LlmError, ProviderCapabilities,
        StopReason, StreamEvent, Usage,
    };

    use super::LlmProvider;

    /// Replays a fixed sequence of responses, one per `complete`/`stream`
    /// call, in order.
    pub(crate) struct ScriptedProvider {
        responses: Mutex<Vec<CompletionResponse>>,
        capabilities: ProviderCapabilities,
    }

    impl ScriptedProvider {
        pub(crate) fn new(mut responses: Vec<CompletionResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                capabilities: ProviderCapabilities {
                    streaming: true,
                    tool_calling: true,
                    max_context_tokens: 200_000,
                    max_output_tokens: 8_192,
                },
            }
        }

        fn next_response(&self) -> Result<CompletionResponse, LlmError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| LlmError::Provider {
                    message: "script exhausted".to_string(),
                })
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.next_response()
        }

        /// Synthesizes stream events from the next scripted response.
        fn stream(
            &self,
            _request: CompletionRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
            let events = match self.next_response() {
                Err(err) => return Box::pin(futures_util::stream::once(async { Err(err) })),
                Ok(response) => {
                    let mut events = vec![Ok(StreamEvent::Connected)];
                    for (i, block) in response.content.iter().enumerate() {
                        match block {
                            ContentBlock::Text { text } => {
                                events.push(Ok(StreamEvent::TextDelta {
                                    index: i as u32,
                                    text: text.clone(),
                                }));
                            }
                            ContentBlock::ToolUse { id, name, input } => {
                                events.push(Ok(StreamEvent::ToolUseComplete {
                                    id: id.clone(),
                                    name: name.clone(),
                                    input: input.clone(),
                                }));
                            }
                            ContentBlock::ToolResult { .. } => {}
                        }
                    }
                    events.push(Ok(StreamEvent::MessageDelta {
                        stop_reason: response.stop_reason,
                    }));
                    events.push(Ok(StreamEvent::Done));
                    events
                }
            };
            Box::pin(futures_util::stream::iter(events))
        }
    }

    pub(crate) fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            id: "msg_test".to_string(),
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
            model: "scripted".to_string(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        }
    }

    pub(crate) fn tool_call_response(name: &str, input: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            id: "msg_test".to_string(),
            content: vec![ContentBlock::ToolUse {
                id: format!("tu_{name}"),
                name: name.to_string(),
                input,
            }],
            model: "scripted".to_string(),
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }

    /// A response mixing visible text with one tool call.
    pub(crate) fn text_and_tool_response(
        text: &str,
        name: &str,
        input: serde_json::Value,
    ) -> CompletionResponse {
        CompletionResponse {
            id: "msg_test".to_string(),
            content: vec![
                ContentBlock::Text {
                    text: text.to_string(),
                },
                ContentBlock::ToolUse {
                    id: format!("tu_{name}"),
                    name: name.to_string(),
                    input,
                },
            ],
            model: "scripted".to_string(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        }
    }
}
