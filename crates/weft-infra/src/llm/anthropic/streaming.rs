//! SSE stream creation and state machine for the Anthropic Messages API.
//!
//! Implements the streaming protocol described in the Anthropic docs:
//! 1. `message_start` -- Message object with initial usage
//! 2. Per block: `content_block_start` -> N x `content_block_delta` -> `content_block_stop`
//! 3. `message_delta` -- stop_reason and cumulative usage
//! 4. `message_stop` -- final event
//! 5. `ping` events may appear anywhere (keepalive)
//! 6. `error` events may appear mid-stream
//!
//! Tool use input arrives as partial JSON fragments via `input_json_delta`.
//! These are accumulated per content block index and parsed only after
//! `content_block_stop`, at which point one `ToolUseComplete` is emitted.

use std::collections::HashMap;
use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use weft_types::llm::{LlmError, StopReason, StreamEvent, Usage};

use super::types::{
    AnthropicDelta, AnthropicRequest, ContentBlockDeltaPayload, ContentBlockStartPayload,
    ContentBlockStopPayload, ErrorPayload, MessageDeltaPayload, MessageStartPayload,
};

/// A tool_use block being assembled from partial JSON fragments.
struct PendingToolUse {
    id: String,
    name: String,
    partial_json: String,
}

/// Create a streaming SSE connection to the Anthropic Messages API.
///
/// Returns a `Stream` of [`StreamEvent`]s that maps Anthropic-specific SSE
/// events to the provider-agnostic stream event enum.
pub fn create_anthropic_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicRequest,
    api_key: &SecretString,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    let client = client.clone();
    let url = url.to_string();
    let api_key = api_key.clone();

    Box::pin(async_stream::stream! {
        let response = match client
            .post(&url)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                yield Err(LlmError::Provider {
                    message: format!("HTTP request failed: {err}"),
                });
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            yield Err(match status.as_u16() {
                401 => LlmError::AuthenticationFailed,
                429 => LlmError::RateLimited { retry_after_ms: None },
                529 => LlmError::Overloaded(error_body),
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
            return;
        }

        yield Ok(StreamEvent::Connected);

        let mut pending_tools: HashMap<u32, PendingToolUse> = HashMap::new();
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    yield Err(LlmError::Stream(err.to_string()));
                    return;
                }
            };

            match event.event.as_str() {
                "message_start" => {
                    if let Ok(payload) = serde_json::from_str::<MessageStartPayload>(&event.data) {
                        tracing::debug!(
                            message_id = %payload.message.id,
                            model = %payload.message.model,
                            "stream started"
                        );
                        if let Some(usage) = payload.message.usage {
                            yield Ok(StreamEvent::Usage(Usage {
                                input_tokens: usage.input_tokens,
                                output_tokens: usage.output_tokens,
                            }));
                        }
                    }
                }
                "ping" => {}
                "content_block_start" => {
                    match serde_json::from_str::<ContentBlockStartPayload>(&event.data) {
                        Ok(payload) => {
                            let content_type = payload.content_block.type_name().to_string();
                            if let super::types::AnthropicContentBlock::ToolUse { id, name, .. } =
                                payload.content_block
                            {
                                pending_tools.insert(
                                    payload.index,
                                    PendingToolUse {
                                        id,
                                        name,
                                        partial_json: String::new(),
                                    },
                                );
                            }
                            yield Ok(StreamEvent::ContentBlockStart {
                                index: payload.index,
                                content_type,
                            });
                        }
                        Err(err) => {
                            yield Err(LlmError::Deserialization(err.to_string()));
                            return;
                        }
                    }
                }
                "content_block_delta" => {
                    match serde_json::from_str::<ContentBlockDeltaPayload>(&event.data) {
                        Ok(payload) => match payload.delta {
                            AnthropicDelta::TextDelta { text } => {
                                yield Ok(StreamEvent::TextDelta {
                                    index: payload.index,
                                    text,
                                });
                            }
                            AnthropicDelta::InputJsonDelta { partial_json } => {
                                if let Some(pending) = pending_tools.get_mut(&payload.index) {
                                    pending.partial_json.push_str(&partial_json);
                                }
                            }
                            AnthropicDelta::SignatureDelta { .. } => {}
                        },
                        Err(err) => {
                            yield Err(LlmError::Deserialization(err.to_string()));
                            return;
                        }
                    }
                }
                "content_block_stop" => {
                    match serde_json::from_str::<ContentBlockStopPayload>(&event.data) {
                        Ok(payload) => {
                            if let Some(pending) = pending_tools.remove(&payload.index) {
                                // Empty input arrives as no fragments at all.
                                let input = if pending.partial_json.is_empty() {
                                    Ok(serde_json::json!({}))
                                } else {
                                    serde_json::from_str(&pending.partial_json)
                                };
                                match input {
                                    Ok(input) => {
                                        yield Ok(StreamEvent::ToolUseComplete {
                                            id: pending.id,
                                            name: pending.name,
                                            input,
                                        });
                                    }
                                    Err(err) => {
                                        yield Err(LlmError::Deserialization(format!(
                                            "tool input is not valid JSON: {err}"
                                        )));
                                        return;
                                    }
                                }
                            }
                            yield Ok(StreamEvent::ContentBlockStop {
                                index: payload.index,
                            });
                        }
                        Err(err) => {
                            yield Err(LlmError::Deserialization(err.to_string()));
                            return;
                        }
                    }
                }
                "message_delta" => {
                    match serde_json::from_str::<MessageDeltaPayload>(&event.data) {
                        Ok(payload) => {
                            let stop_reason = payload
                                .delta
                                .stop_reason
                                .as_deref()
                                .and_then(|reason| reason.parse().ok())
                                .unwrap_or(StopReason::EndTurn);
                            yield Ok(StreamEvent::MessageDelta { stop_reason });
                            yield Ok(StreamEvent::Usage(Usage {
                                input_tokens: payload.usage.input_tokens,
                                output_tokens: payload.usage.output_tokens,
                            }));
                        }
                        Err(err) => {
                            yield Err(LlmError::Deserialization(err.to_string()));
                            return;
                        }
                    }
                }
                "message_stop" => {
                    yield Ok(StreamEvent::Done);
                    return;
                }
                "error" => {
                    let message = serde_json::from_str::<ErrorPayload>(&event.data)
                        .map(|payload| {
                            format!("{}: {}", payload.error.error_type, payload.error.message)
                        })
                        .unwrap_or_else(|_| event.data.clone());
                    yield Err(LlmError::Stream(message));
                    return;
                }
                _ => {}
            }
        }
    })
}
