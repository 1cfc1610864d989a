//! The graph-executing runtime.
//!
//! Drives one turn of the pipeline: the router picks the entry station,
//! then each station's command is merged through the fixed reducer and the
//! runtime moves on to the command's `next` until a station routes to
//! graph-terminal. Exactly one station executes at a time; there is no
//! parallel agent execution and no internal locking -- callers must
//! serialize runs per session.
//!
//! A turn that ends with `pending_question` set is a suspended run: the
//! session id plus that question form the resumable continuation. The host
//! resumes by appending the user's reply
//! ([`ConversationState::push_user_message`]) and calling
//! [`Pipeline::run_turn`] again, which re-enters enrichment.

use std::sync::Arc;

use tracing::info;

use weft_types::config::PipelineConfig;
use weft_types::error::{Stage, WeftError};
use weft_types::state::{Command, ConversationState, Station};

use crate::agents::enrichment::EnrichmentAgent;
use crate::agents::execution::ExecutionAgent;
use crate::agents::planning::PlanningAgent;
use crate::agents::TokenSink;
use crate::llm::BoxLlmProvider;
use crate::reducer::apply_delta;
use crate::router::route;
use crate::tool::ToolSet;
use crate::validation::{ValidatePlanTool, Validator};

/// The state a turn ended in.
#[derive(Debug)]
pub struct TurnOutcome {
    pub state: ConversationState,
}

impl TurnOutcome {
    /// True when the run suspended on a clarifying question and needs user
    /// input to resume.
    pub fn awaiting_user(&self) -> bool {
        self.state.pending_question.is_some()
    }
}

/// One configured pipeline instance.
///
/// Holds the provider, the agents, and the tool sets. The planning tool set
/// always includes the `validate_plan` tool in addition to whatever the
/// host registers (catalog and docs lookups); the execution tool set is
/// absent until the host supplies platform-backed tools, and reaching the
/// execution station without it is a fatal configuration error.
pub struct Pipeline {
    config: PipelineConfig,
    validator: Arc<Validator>,
    enrichment: EnrichmentAgent,
    planning: PlanningAgent,
    execution: ExecutionAgent,
    planning_tools: ToolSet,
    execution_tools: Option<ToolSet>,
    token_sink: Option<TokenSink>,
}

impl Pipeline {
    /// Build a pipeline from a provider and configuration.
    pub fn new(provider: Arc<BoxLlmProvider>, config: PipelineConfig) -> Self {
        let validator = Arc::new(Validator::new(
            provider.clone(),
            config.model.clone(),
            config.max_tokens,
        ));
        let planning_tools = ToolSet::new().register(ValidatePlanTool::new(validator.clone()));

        Self {
            enrichment: EnrichmentAgent::new(
                provider.clone(),
                config.model.clone(),
                config.max_tokens,
            ),
            planning: PlanningAgent::new(
                provider.clone(),
                config.model.clone(),
                config.max_tokens,
                config.max_tool_iterations,
            ),
            execution: ExecutionAgent::new(
                provider,
                config.model.clone(),
                config.max_tokens,
                config.max_tool_iterations,
            ),
            validator,
            planning_tools,
            execution_tools: None,
            token_sink: None,
            config,
        }
    }

    /// Replace the planning tools (catalog and docs lookups).
    ///
    /// The `validate_plan` tool is re-registered on top of the given set.
    pub fn with_planning_tools(mut self, tools: ToolSet) -> Self {
        self.planning_tools = tools.register(ValidatePlanTool::new(self.validator.clone()));
        self
    }

    /// Supply the platform-backed execution tools (credential check and
    /// workflow creation). Without them the execution station fails fatally.
    pub fn with_execution_tools(mut self, tools: ToolSet) -> Self {
        self.execution_tools = Some(tools);
        self
    }

    /// Attach a token sink receiving the enrichment reply as it streams.
    pub fn with_token_sink(mut self, sink: TokenSink) -> Self {
        self.token_sink = Some(sink);
        self
    }

    /// Run one turn to graph-terminal.
    pub async fn run_turn(&self, state: ConversationState) -> Result<TurnOutcome, WeftError> {
        let command = route(&state, self.config.confidence_threshold);
        let mut state = apply_delta(state, command.delta);
        let mut next = command.next;

        info!(session_id = %state.session_id, entry = %next, "turn started");

        while next != Station::End {
            let command: Command = match next {
                Station::Enrichment => {
                    self.enrichment
                        .run(&state, self.token_sink.as_ref())
                        .await?
                }
                Station::Planning => {
                    self.planning
                        .run(&state, &self.planning_tools, &self.validator)
                        .await?
                }
                Station::Execution => {
                    let tools = self.execution_tools.as_ref().ok_or_else(|| {
                        WeftError::Configuration {
                            stage: Stage::Execution,
                            message: "automation platform API key missing".to_string(),
                        }
                    })?;
                    self.execution.run(&state, tools).await?
                }
                Station::End => break,
            };
            state = apply_delta(state, command.delta);
            next = command.next;
        }

        info!(session_id = %state.session_id, "turn finished");
        Ok(TurnOutcome { state })
    }

    /// Whether the host should immediately run another turn without new
    /// user input: requirements are complete and confident enough to plan,
    /// and nothing has been built yet.
    pub fn should_auto_continue(&self, state: &ConversationState) -> bool {
        state.workflow_id.is_none()
            && route(state, self.config.confidence_threshold).next == Station::Planning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use weft_types::llm::CompletionResponse;
    use weft_types::state::Mode;

    use crate::agents::enrichment::REPORT_TOOL;
    use crate::agents::execution::{CREDENTIAL_CHECK_TOOL, WORKFLOW_CREATE_TOOL};
    use crate::llm::testing::{
        text_and_tool_response, text_response, tool_call_response, ScriptedProvider,
    };
    use crate::tool::{Tool, ToolError};

    const PLAN_TEXT: &str = "\
```
@plan
title: Morning briefing
summary: Posts the weather to Slack every morning.
@credentials needed
- kind=slackApi; name=Slack account; for=posting; node_id=b; node_name=Slack
@workflow Morning briefing | active=false
@node a | Cron | n8n-nodes-base.cron | v1 | (250,300)
  param triggerTimes = {\"hour\":8}
@node b | Slack | n8n-nodes-base.slack | v1 | (450,300)
  param channel = \"#general\"
@connect Cron #0 -> Slack @0
@end
```";

    const BROKEN_PLAN_TEXT: &str = "\
```
@plan
title: Morning briefing
summary: Posts the weather to Slack every morning.
@workflow Morning briefing | active=false
@node a | Cron | n8n-nodes-base.cron | v1 | (250,300)
@node b | Slack | n8n-nodes-base.slack | v1 | (450,300)
@connect Cron #0 -> Ghost @0
@end
```";

    const CORRECTED_PLAN_TEXT: &str = "\
@plan
title: Morning briefing
summary: Posts the weather to Slack every morning.
@workflow Morning briefing | active=false
@node a | Cron | n8n-nodes-base.cron | v1 | (250,300)
@node b | Slack | n8n-nodes-base.slack | v1 | (450,300)
@connect Cron #0 -> Slack @0
@end";

    struct StubCatalog;

    impl Tool for StubCatalog {
        fn name(&self) -> &str {
            "fetch_node_catalog"
        }

        fn description(&self) -> &str {
            "Lists available node types."
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        async fn call(&self, _input: serde_json::Value) -> Result<String, ToolError> {
            Ok("n8n-nodes-base.cron\nn8n-nodes-base.slack".to_string())
        }
    }

    struct StubCredentialCheck {
        exists: bool,
    }

    impl Tool for StubCredentialCheck {
        fn name(&self) -> &str {
            CREDENTIAL_CHECK_TOOL
        }

        fn description(&self) -> &str {
            "Checks whether a credential of the given type exists."
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        async fn call(&self, input: serde_json::Value) -> Result<String, ToolError> {
            let kind = input["kind"].as_str().unwrap_or_default();
            Ok(serde_json::json!({
                "kind": kind,
                "exists": self.exists,
                "setup_url": format!("http://localhost:5678/credentials/new/{kind}"),
            })
            .to_string())
        }
    }

    struct StubWorkflowCreate;

    impl Tool for StubWorkflowCreate {
        fn name(&self) -> &str {
            WORKFLOW_CREATE_TOOL
        }

        fn description(&self) -> &str {
            "Creates the workflow on the platform."
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        async fn call(&self, _input: serde_json::Value) -> Result<String, ToolError> {
            Ok(serde_json::json!({"id": "wf_123"}).to_string())
        }
    }

    fn pipeline(script: Vec<CompletionResponse>, credential_exists: bool) -> Pipeline {
        let provider = Arc::new(BoxLlmProvider::new(ScriptedProvider::new(script)));
        Pipeline::new(provider, PipelineConfig::default())
            .with_planning_tools(ToolSet::new().register(StubCatalog))
            .with_execution_tools(
                ToolSet::new()
                    .register(StubCredentialCheck {
                        exists: credential_exists,
                    })
                    .register(StubWorkflowCreate),
            )
    }

    fn enrichment_complete_response() -> CompletionResponse {
        text_and_tool_response(
            "Perfect, I have everything I need.",
            REPORT_TOOL,
            serde_json::json!({"has_all_required_info": true, "confidence": 0.95}),
        )
    }

    fn fresh_state() -> ConversationState {
        let mut state = ConversationState::new(Uuid::now_v7());
        state.push_user_message("post the weather to #general every morning at 8");
        state
    }

    #[tokio::test]
    async fn test_scenario_a_happy_path() {
        let pipeline = pipeline(
            vec![
                // Turn 1: enrichment reports complete requirements.
                enrichment_complete_response(),
                // Turn 2: planning looks at the catalog, then answers.
                tool_call_response("fetch_node_catalog", serde_json::json!({})),
                text_response(PLAN_TEXT),
                // Validator verdict.
                text_response("[VALID] every node type exists"),
                // Execution: credential check, create, summary.
                tool_call_response(CREDENTIAL_CHECK_TOOL, serde_json::json!({"kind": "slackApi"})),
                tool_call_response(WORKFLOW_CREATE_TOOL, serde_json::json!({})),
                text_response("Created the workflow."),
            ],
            true,
        );

        let outcome = pipeline.run_turn(fresh_state()).await.unwrap();
        assert!(!outcome.awaiting_user());
        assert!(pipeline.should_auto_continue(&outcome.state));

        let outcome = pipeline.run_turn(outcome.state).await.unwrap();
        let state = outcome.state;
        assert_eq!(state.mode, Mode::Workflow);
        assert_eq!(state.workflow_id.as_deref(), Some("wf_123"));
        assert!(state.credential_guidance.is_none());
        assert!(state.plan.is_some());
        assert!(!pipeline.should_auto_continue(&state));
    }

    #[tokio::test]
    async fn test_scenario_b_validator_autofix() {
        let pipeline = pipeline(
            vec![
                enrichment_complete_response(),
                // Planning emits a plan whose connection targets a ghost node.
                text_response(BROKEN_PLAN_TEXT),
                // Validator rejects and supplies the corrected document.
                text_response(&format!(
                    "[INVALID] The connection targets 'Ghost', which is not a node.\n```\n{CORRECTED_PLAN_TEXT}\n```"
                )),
                tool_call_response(WORKFLOW_CREATE_TOOL, serde_json::json!({})),
                text_response("Created the workflow."),
            ],
            true,
        );

        let outcome = pipeline.run_turn(fresh_state()).await.unwrap();
        let outcome = pipeline.run_turn(outcome.state).await.unwrap();

        let state = outcome.state;
        // Execution ran with the corrected plan.
        assert_eq!(state.workflow_id.as_deref(), Some("wf_123"));
        let plan = state.plan.unwrap();
        assert_eq!(plan.workflow.connections["Cron"].main[0][0].node, "Slack");
    }

    #[tokio::test]
    async fn test_scenario_c_partial_success_with_guidance() {
        let pipeline = pipeline(
            vec![
                enrichment_complete_response(),
                text_response(PLAN_TEXT),
                text_response("[VALID] looks right"),
                tool_call_response(CREDENTIAL_CHECK_TOOL, serde_json::json!({"kind": "slackApi"})),
                tool_call_response(WORKFLOW_CREATE_TOOL, serde_json::json!({})),
                text_response("Created; Slack still needs to be connected."),
            ],
            // Credential does not exist yet.
            false,
        );

        let outcome = pipeline.run_turn(fresh_state()).await.unwrap();
        let outcome = pipeline.run_turn(outcome.state).await.unwrap();

        let state = outcome.state;
        assert_eq!(state.workflow_id.as_deref(), Some("wf_123"));
        let guidance = state.credential_guidance.unwrap();
        assert_eq!(guidance.len(), 1);
        assert_eq!(guidance[0].kind, "slackApi");
        assert!(guidance[0].setup_url.contains("/credentials/new/slackApi"));
    }

    #[tokio::test]
    async fn test_clarification_suspends_run() {
        let pipeline = pipeline(
            vec![text_and_tool_response(
                "Which channel should I post to?",
                REPORT_TOOL,
                serde_json::json!({
                    "has_all_required_info": false,
                    "confidence": 0.5,
                    "missing_info": ["target channel"]
                }),
            )],
            true,
        );

        let outcome = pipeline.run_turn(fresh_state()).await.unwrap();
        assert!(outcome.awaiting_user());
        assert_eq!(
            outcome.state.pending_question.as_deref(),
            Some("Which channel should I post to?")
        );
        assert_eq!(outcome.state.mode, Mode::Chat);
        assert!(!pipeline.should_auto_continue(&outcome.state));
    }

    #[tokio::test]
    async fn test_confidence_at_threshold_stays_in_chat() {
        let pipeline = pipeline(
            vec![text_and_tool_response(
                "I believe that's everything.",
                REPORT_TOOL,
                serde_json::json!({"has_all_required_info": true, "confidence": 0.8}),
            )],
            true,
        );

        let outcome = pipeline.run_turn(fresh_state()).await.unwrap();
        // Exactly 0.8 does not clear the strict threshold.
        assert!(!pipeline.should_auto_continue(&outcome.state));
    }

    #[tokio::test]
    async fn test_execution_without_platform_tools_is_fatal() {
        let provider = Arc::new(BoxLlmProvider::new(ScriptedProvider::new(vec![
            text_response(PLAN_TEXT),
            text_response("[VALID] fine"),
        ])));
        let pipeline = Pipeline::new(provider, PipelineConfig::default());

        let mut state = fresh_state();
        state.requirements = Some(weft_types::state::RequirementsStatus {
            has_all_required_info: true,
            confidence: 0.95,
            missing_info: Vec::new(),
        });

        let err = pipeline.run_turn(state).await.unwrap_err();
        match err {
            WeftError::Configuration { stage, message } => {
                assert_eq!(stage, Stage::Execution);
                assert!(message.contains("platform API key"));
            }
            other => panic!("expected ConfigurationError, got {other:?}"),
        }
    }
}
