//! Planning agent: conversation history -> structured plan.
//!
//! Runs the bounded tool loop with the node-type catalog, node docs, and
//! plan-validation tools available. The final answer is fence-stripped and
//! parsed as a Loom document; parse failure is fatal for the turn with no
//! auto-retry. The parsed plan then goes through the semantic validator
//! once -- a correction offered there replaces the plan wholesale before
//! anything is written to state.

use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use weft_types::error::{Stage, WeftError};
use weft_types::llm::CompletionRequest;
use weft_types::state::{Command, ConversationState, Station};

use super::history_messages;
use crate::convert::convert_plan;
use crate::llm::BoxLlmProvider;
use crate::loom::{format_plan, parse_plan, strip_fences};
use crate::tool::tool_loop::run_tool_loop;
use crate::tool::ToolSet;
use crate::validation::{PlanVerdict, Validator};

const PLANNING_PROMPT: &str = "\
You design automation workflows for an n8n-compatible platform. From the \
conversation, produce a complete plan in the Loom format.

Use your tools: fetch_node_catalog to see which node types exist, \
fetch_node_docs for a node's parameters, and validate_plan to check a draft \
before answering. Always validate your draft.

Your final answer must be ONLY the Loom document in a fenced code block:

```
@plan
title: <short title>
summary: <one sentence>
@credentials needed
- kind=<credential type>; name=<display name>; for=<what it unlocks>; node_id=<node id>; node_name=<node name>
@workflow <name> | active=false
@node <id> | <name> | <platform node type> | v<version> | (x,y)
  param <key> = <json value>
@connect <source name> #<output port> -> <target name> @<input index>
@end
```";

/// The planning station.
pub struct PlanningAgent {
    provider: Arc<BoxLlmProvider>,
    model: String,
    max_tokens: u32,
    max_iterations: usize,
}

impl PlanningAgent {
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

    /// Run one planning turn and route to execution with the plan set.
    pub async fn run(
        &self,
        state: &ConversationState,
        tools: &ToolSet,
        validator: &Validator,
    ) -> Result<Command, WeftError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: history_messages(state),
            system: Some(PLANNING_PROMPT.to_string()),
            max_tokens: self.max_tokens,
            temperature: None,
            stream: false,
            stop_sequences: None,
            tools: Vec::new(),
            tool_choice: None,
        };

        let span = info_span!(
            "gen_ai.plan_workflow",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
        );

        let outcome = run_tool_loop(
            &self.provider,
            request,
            tools,
            self.max_iterations,
            Stage::Planning,
        )
        .instrument(span)
        .await?;

        let stripped = strip_fences(&outcome.final_response.text());
        let parsed = parse_plan(&stripped);
        let data = match parsed.data {
            Some(data) if parsed.success => data,
            _ => {
                return Err(WeftError::ProtocolParse {
                    stage: Stage::Planning,
                    errors: parsed.errors,
                    snippet: WeftError::snippet_of(&stripped),
                });
            }
        };

        let plan = convert_plan(&data);
        info!(title = %plan.title, nodes = plan.workflow.nodes.len(), "plan drafted");

        // Semantic check with single-shot auto-fix substitution.
        let plan = match validator.check(&format_plan(&plan)).await? {
            PlanVerdict::Valid => plan,
            PlanVerdict::Corrected(fixed) => {
                info!(title = %fixed.title, "plan replaced by validator correction");
                *fixed
            }
        };

        let mut cmd = Command::to(Station::Execution);
        cmd.delta.plan = Some(plan);
        Ok(cmd)
    }
}
