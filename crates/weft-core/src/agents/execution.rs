//! Execution agent: deploy the plan to the automation platform.
//!
//! The embedded workflow definition passes the schema normalizer before any
//! tool runs -- the deterministic safety net in front of the platform. The
//! agent then drives a bounded tool loop with the credential-check and
//! workflow-create tools. Missing credentials never block creation: they
//! surface as credential guidance next to the created workflow (partial
//! success by design). Terminal station.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{info, info_span, warn, Instrument};

use weft_types::error::{FieldError, Stage, WeftError};
use weft_types::llm::{CompletionRequest, Message};
use weft_types::plan::Plan;
use weft_types::state::{ChatMessage, Command, ConversationState, CredentialGuidance, Station};

use crate::llm::BoxLlmProvider;
use crate::normalize::normalize_workflow;
use crate::tool::tool_loop::{run_tool_loop, ToolInvocation};
use crate::tool::ToolSet;

/// Tool the execution loop uses to probe for existing credentials.
pub const CREDENTIAL_CHECK_TOOL: &str = "check_credentials";
/// Tool the execution loop uses to create the workflow.
pub const WORKFLOW_CREATE_TOOL: &str = "create_workflow";

const EXECUTION_PROMPT: &str = "\
You deploy a finished workflow to the automation platform.

First call check_credentials once for every credential type the plan needs. \
Then call create_workflow with the workflow definition EXACTLY as given -- \
do not modify it. Create the workflow even if credentials are missing; the \
user connects accounts afterwards.

Finish with a short summary naming the created workflow id and any \
credentials the user still has to set up.";

/// The terminal deployment station.
pub struct ExecutionAgent {
    provider: Arc<BoxLlmProvider>,
    model: String,
    max_tokens: u32,
    max_iterations: usize,
}

impl ExecutionAgent {
    pub fn new(
        provider: Arc<BoxLlmProvider>,
        model: String,
        max_tokens: u32,
        max_iterations: usize,
    ) -> Self {
        Self {
            provider,
            model,
            max_tokens,
            max_iterations,
        }
    }

    /// Deploy the in-flight plan. Fatal when no plan is present.
    pub async fn run(
        &self,
        state: &ConversationState,
        tools: &ToolSet,
    ) -> Result<Command, WeftError> {
        let Some(plan) = &state.plan else {
            return Err(WeftError::Configuration {
                stage: Stage::Execution,
                message: "no plan to execute".to_string(),
            });
        };

        // Deterministic safety net: normalize unconditionally, regardless of
        // the semantic validator's verdict.
        let candidate = serde_json::to_value(&plan.workflow).map_err(|err| {
            WeftError::Normalization {
                errors: vec![FieldError::new(
                    "workflow",
                    format!("definition is not serializable: {err}"),
                    "rebuild the plan",
                )],
            }
        })?;
        let workflow =
            normalize_workflow(&candidate).map_err(|errors| WeftError::Normalization { errors })?;

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(deploy_instructions(plan, &workflow)?)],
            system: Some(EXECUTION_PROMPT.to_string()),
            max_tokens: self.max_tokens,
            temperature: None,
            stream: false,
            stop_sequences: None,
            tools: Vec::new(),
            tool_choice: None,
        };

        let span = info_span!(
            "gen_ai.execute_workflow",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
        );

        let outcome = run_tool_loop(
            &self.provider,
            request,
            tools,
            self.max_iterations,
            Stage::Execution,
        )
        .instrument(span)
        .await?;

        let final_text = outcome.final_response.text();
        let workflow_id = extract_workflow_id(&outcome.invocations, &final_text);
        match &workflow_id {
            Some(id) => info!(workflow_id = %id, "workflow created"),
            None => warn!("no workflow id found in tool results or final text"),
        }

        let guidance = collect_credential_guidance(&outcome.invocations, plan);
        if !guidance.is_empty() {
            info!(missing = guidance.len(), "credentials still need setup");
        }

        let mut cmd = Command::to(Station::End);
        cmd.delta.workflow_id = workflow_id;
        if !guidance.is_empty() {
            cmd.delta.credential_guidance = Some(guidance);
        }
        if !final_text.is_empty() {
            cmd.delta.messages.push(ChatMessage::assistant(final_text));
        }
        cmd.delta.pending_question = Some(None);
        Ok(cmd)
    }
}

fn deploy_instructions(
    plan: &Plan,
    workflow: &weft_types::workflow::WorkflowDefinition,
) -> Result<String, WeftError> {
    let definition = serde_json::to_string(workflow).map_err(|err| WeftError::Normalization {
        errors: vec![FieldError::new(
            "workflow",
            format!("definition is not serializable: {err}"),
            "rebuild the plan",
        )],
    })?;

    let kinds: Vec<&str> = plan
        .credentials_needed
        .iter()
        .map(|cred| cred.kind.as_str())
        .filter(|kind| !kind.is_empty())
        .collect();

    Ok(format!(
        "Credential types to check: {}\n\nWorkflow definition:\n{definition}",
        if kinds.is_empty() {
            "none".to_string()
        } else {
            kinds.join(", ")
        }
    ))
}

/// Best-effort workflow id extraction.
///
/// Most recent structured tool result first (the create tool returns
/// `{"id": ...}`); regex over the final text as fallback.
fn extract_workflow_id(invocations: &[ToolInvocation], final_text: &str) -> Option<String> {
    for invocation in invocations.iter().rev() {
        if invocation.is_error {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&invocation.output) {
            if let Some(id) = id_field(&value) {
                return Some(id);
            }
        }
    }

    static ID_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = ID_PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\bid\b\s*[:=]?\s*["']?([A-Za-z0-9][A-Za-z0-9_-]{2,})["']?"#)
            .expect("id pattern is valid")
    });
    pattern
        .captures(final_text)
        .map(|captures| captures[1].to_string())
}

fn id_field(value: &serde_json::Value) -> Option<String> {
    for candidate in [&value["id"], &value["data"]["id"]] {
        match candidate {
            serde_json::Value::String(id) if !id.is_empty() => return Some(id.clone()),
            serde_json::Value::Number(id) => return Some(id.to_string()),
            _ => {}
        }
    }
    None
}

/// Turn failed credential checks into non-blocking guidance.
fn collect_credential_guidance(
    invocations: &[ToolInvocation],
    plan: &Plan,
) -> Vec<CredentialGuidance> {
    let mut guidance = Vec::new();
    for invocation in invocations {
        if invocation.name != CREDENTIAL_CHECK_TOOL || invocation.is_error {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&invocation.output) else {
            continue;
        };
        if value["exists"].as_bool() != Some(false) {
            continue;
        }
        let kind = value["kind"].as_str().unwrap_or_default().to_string();
        if kind.is_empty() {
            continue;
        }

        // Prefer the plan's display name for this credential type.
        let name = plan
            .credentials_needed
            .iter()
            .find(|cred| cred.kind == kind && !cred.name.is_empty())
            .map(|cred| cred.name.clone())
            .unwrap_or_else(|| kind.clone());

        guidance.push(CredentialGuidance {
            name,
            kind,
            setup_url: value["setup_url"].as_str().unwrap_or_default().to_string(),
        });
    }
    guidance
}
