//! LLM-based semantic plan validation with single-shot auto-fix.
//!
//! The validator asks the model to judge a serialized plan against its
//! trained knowledge of the platform's node catalog. Deliberately no
//! hardcoded rule engine here: the deterministic structural net is
//! `crate::normalize`, which runs unconditionally before execution
//! regardless of the verdict produced here.
//!
//! Response contract: the verdict must begin with `[VALID]` or `[INVALID]`.
//! An `[INVALID]` response must also carry a corrected serialization, which
//! is extracted once (best effort, not iterated) and substituted for the
//! in-flight plan.

use std::sync::Arc;

use tracing::info;

use weft_types::error::{Stage, WeftError};
use weft_types::llm::{CompletionRequest, Message};
use weft_types::plan::Plan;

use crate::convert::convert_plan;
use crate::llm::BoxLlmProvider;
use crate::loom::{format_plan, parse_plan, strip_fences};
use crate::tool::{Tool, ToolError};

/// Verdict sentinel for a semantically valid plan.
pub const VALID_SENTINEL: &str = "[VALID]";
/// Verdict sentinel for an invalid plan (must be followed by a correction).
pub const INVALID_SENTINEL: &str = "[INVALID]";

const VALIDATOR_PROMPT: &str = "\
You validate automation workflow plans written in the Loom format against \
your knowledge of the automation platform's node catalog: node type names, \
their parameters, credential types, and how nodes connect.

Begin your answer with exactly [VALID] or [INVALID].

If the plan is invalid, explain every problem briefly, then include a fully \
corrected plan as a complete Loom document (from @plan to @end) in a fenced \
code block. Keep everything that was already correct unchanged.";

/// The outcome of a semantic check.
#[derive(Debug)]
pub enum PlanVerdict {
    /// The plan passed; no state change.
    Valid,
    /// The plan was corrected; the carried plan replaces the in-flight one.
    Corrected(Box<Plan>),
}

/// The semantic validation capability.
///
/// Used two ways: directly by the planning agent after it parses its final
/// answer, and as the `validate_plan` tool inside the planning loop (via
/// [`ValidatePlanTool`]).
pub struct Validator {
    provider: Arc<BoxLlmProvider>,
    model: String,
    max_tokens: u32,
}

impl Validator {
    pub fn new(provider: Arc<BoxLlmProvider>, model: String, max_tokens: u32) -> Self {
        Self {
            provider,
            model,
            max_tokens,
        }
    }

    /// Check a serialized plan, extracting a correction when offered.
    pub async fn check(&self, serialized: &str) -> Result<PlanVerdict, WeftError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(format!(
                "Validate this plan:\n\n{serialized}"
            ))],
            system: Some(VALIDATOR_PROMPT.to_string()),
            max_tokens: self.max_tokens,
            temperature: None,
            stream: false,
            stop_sequences: None,
            tools: Vec::new(),
            tool_choice: None,
        };

        let response = self.provider.complete(&request).await.map_err(|source| {
            WeftError::Llm {
                stage: Stage::Validation,
                source,
            }
        })?;

        let text = response.text();
        let verdict = text.trim_start();

        if verdict.starts_with(VALID_SENTINEL) {
            info!("plan passed semantic validation");
            return Ok(PlanVerdict::Valid);
        }

        if verdict.starts_with(INVALID_SENTINEL) {
            let corrected = extract_correction(&text).ok_or_else(|| WeftError::Validation {
                explanation: text.clone(),
            })?;
            info!("plan corrected by validator");
            return Ok(PlanVerdict::Corrected(Box::new(corrected)));
        }

        Err(WeftError::UnexpectedProtocol {
            stage: Stage::Validation,
            snippet: WeftError::snippet_of(&text),
        })
    }
}

/// Single best-effort extraction of the corrected serialization.
///
/// Prefers a fenced block; falls back to the `@plan`..`@end` slice of the
/// raw response. Returns `None` when nothing parseable is found.
fn extract_correction(text: &str) -> Option<Plan> {
    let candidate = if text.contains("```") {
        strip_fences(text)
    } else {
        let start = text.find("@plan")?;
        let end = text[start..]
            .find("@end")
            .map(|i| start + i + "@end".len())
            .unwrap_or(text.len());
        text[start..end].to_string()
    };

    let outcome = parse_plan(&candidate);
    if !outcome.success {
        return None;
    }
    Some(convert_plan(&outcome.data?))
}

/// `validate_plan` as a tool for the planning loop.
///
/// Inside the loop a failed validation is not fatal: the verdict text --
/// including any corrected serialization -- is returned to the planning
/// model so it can fold the fix into its final answer.
pub struct ValidatePlanTool {
    validator: Arc<Validator>,
}

impl ValidatePlanTool {
    pub fn new(validator: Arc<Validator>) -> Self {
        Self { validator }
    }
}

impl Tool for ValidatePlanTool {
    fn name(&self) -> &str {
        "validate_plan"
    }

    fn description(&self) -> &str {
        "Semantically validate a Loom plan against the platform node catalog. \
         Returns [VALID], or [INVALID] with a corrected plan."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "plan": {
                    "type": "string",
                    "description": "The complete Loom document to validate."
                }
            },
            "required": ["plan"]
        })
    }

    async fn call(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let serialized = input["plan"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidInput("missing 'plan'".to_string()))?;

        match self.validator.check(serialized).await {
            Ok(PlanVerdict::Valid) => Ok(format!("{VALID_SENTINEL} plan passes validation")),
            Ok(PlanVerdict::Corrected(plan)) => Ok(format!(
                "{INVALID_SENTINEL} corrected plan:\n{}",
                format_plan(&plan)
            )),
            Err(err) => Err(ToolError::Execution(err.to_string())),
        }
    }
}
