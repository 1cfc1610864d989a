//! Requirement-gathering agent.
//!
//! One LLM call over the full history. The visible reply streams to the
//! caller token by token (when a sink is attached); the requirements
//! assessment travels through a constrained side channel -- a forced-schema
//! `report_requirements` tool call -- so the router never parses free text.
//! No internal retries.

use std::sync::Arc;

use futures_util::StreamExt;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, info_span, Instrument};

use weft_types::error::{Stage, WeftError};
use weft_types::llm::{CompletionRequest, StreamEvent, ToolDefinition};
use weft_types::state::{ChatMessage, Command, ConversationState, RequirementsStatus, Station};

use super::{history_messages, TokenSink};
use crate::llm::BoxLlmProvider;

/// Name of the side-channel status tool.
pub const REPORT_TOOL: &str = "report_requirements";

const ENRICHMENT_PROMPT: &str = "\
You gather requirements for building an automation workflow. Read the whole \
conversation and reply conversationally: confirm what you understood, and \
ask for exactly the missing details (trigger, services involved, what data \
flows where) -- one focused question at a time.

After writing your reply you MUST call the report_requirements tool with \
your assessment of whether everything needed to build the workflow is known, \
your confidence from 0 to 1, and anything still missing.";

/// Schema of the `report_requirements` side channel.
#[derive(Debug, Deserialize, JsonSchema)]
struct RequirementsReport {
    /// Whether everything needed to build the workflow is known.
    has_all_required_info: bool,
    /// Confidence in that assessment, 0..1.
    confidence: f64,
    /// Outstanding details, empty when nothing is missing.
    #[serde(default)]
    missing_info: Vec<String>,
}

/// The requirement-gathering station.
pub struct EnrichmentAgent {
    provider: Arc<BoxLlmProvider>,
    model: String,
    max_tokens: u32,
}

impl EnrichmentAgent {
    pub fn new(provider: Arc<BoxLlmProvider>, model: String, max_tokens: u32) -> Self {
        Self {
            provider,
            model,
            max_tokens,
        }
    }

    /// Run one enrichment turn.
    ///
    /// Returns a command routing to graph-terminal with the requirements
    /// status updated and the reply appended. When details are missing the
    /// reply doubles as the pending clarification question.
    pub async fn run(
        &self,
        state: &ConversationState,
        sink: Option<&TokenSink>,
    ) -> Result<Command, WeftError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: history_messages(state),
            system: Some(ENRICHMENT_PROMPT.to_string()),
            max_tokens: self.max_tokens,
            temperature: None,
            stream: sink.is_some(),
            stop_sequences: None,
            tools: vec![report_tool_definition()],
            tool_choice: None,
        };

        let span = info_span!(
            "gen_ai.gather_requirements",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
        );

        let (reply, report) = match sink {
            Some(sink) => self.streamed(request, sink).instrument(span).await?,
            None => self.buffered(request).instrument(span).await?,
        };

        let Some(report) = report else {
            return Err(WeftError::UnexpectedProtocol {
                stage: Stage::Enrichment,
                snippet: WeftError::snippet_of(&reply),
            });
        };

        info!(
            has_all = report.has_all_required_info,
            confidence = report.confidence,
            missing = report.missing_info.len(),
            "requirements reported"
        );

        let mut cmd = Command::to(Station::End);
        cmd.delta.requirements = Some(RequirementsStatus {
            has_all_required_info: report.has_all_required_info,
            confidence: report.confidence,
            missing_info: report.missing_info,
        });
        cmd.delta.pending_question = if report.has_all_required_info {
            Some(None)
        } else {
            Some(Some(reply.clone()))
        };
        if !reply.is_empty() {
            cmd.delta.messages.push(ChatMessage::assistant(reply));
        }
        Ok(cmd)
    }

    /// Non-streaming path: one `complete` call.
    async fn buffered(
        &self,
        request: CompletionRequest,
    ) -> Result<(String, Option<RequirementsReport>), WeftError> {
        let response = self.provider.complete(&request).await.map_err(|source| {
            WeftError::Llm {
                stage: Stage::Enrichment,
                source,
            }
        })?;

        let report = response
            .tool_uses()
            .into_iter()
            .find(|(_, name, _)| *name == REPORT_TOOL)
            .and_then(|(_, _, input)| serde_json::from_value(input.clone()).ok());
        Ok((response.text(), report))
    }

    /// Streaming path: forward text deltas to the sink while assembling the
    /// reply and watching for the side-channel tool call.
    async fn streamed(
        &self,
        request: CompletionRequest,
        sink: &TokenSink,
    ) -> Result<(String, Option<RequirementsReport>), WeftError> {
        let mut stream = self.provider.stream(request);
        let mut reply = String::new();
        let mut report = None;

        while let Some(event) = stream.next().await {
            let event = event.map_err(|source| WeftError::Llm {
                stage: Stage::Enrichment,
                source,
            })?;
            match event {
                StreamEvent::TextDelta { text, .. } => {
                    // Fire-and-forget: a dropped receiver must not stall the turn.
                    let _ = sink.send(text.clone());
                    reply.push_str(&text);
                }
                StreamEvent::ToolUseComplete { name, input, .. } if name == REPORT_TOOL => {
                    report = serde_json::from_value(input).ok();
                }
                _ => {}
            }
        }

        Ok((reply, report))
    }
}

fn report_tool_definition() -> ToolDefinition {
    let schema = serde_json::to_value(schemars::schema_for!(RequirementsReport))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
    ToolDefinition {
        name: REPORT_TOOL.to_string(),
        description: "Report whether all information required to build the workflow \
                      is present, with a confidence score and what is still missing."
            .to_string(),
        input_schema: schema,
    }
}
