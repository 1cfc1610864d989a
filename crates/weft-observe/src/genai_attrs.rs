//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions specification for
//! consistent LLM call instrumentation across the pipeline. All constants
//! are string slices usable in `tracing::span!` and `tracing::info_span!`
//! field names.
//!
//! Span naming convention: `"{operation} {model}"` (e.g.,
//! `"plan_workflow claude-sonnet-4-20250514"`)

// --- Required attributes ---

/// The name of the operation being performed (e.g., "plan_workflow").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "anthropic").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model ID requested (e.g., "claude-sonnet-4-20250514").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The sampling temperature for the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reasons for the response (e.g., "end_turn", "tool_use").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// The unique response/message ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

// --- Tool attributes ---

/// The name of the tool being executed within an agent turn.
pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";

// --- Operation name values ---

/// Requirement gathering over the conversation history.
pub const OP_GATHER_REQUIREMENTS: &str = "gather_requirements";

/// Plan drafting with the tool loop.
pub const OP_PLAN_WORKFLOW: &str = "plan_workflow";

/// Semantic plan validation.
pub const OP_VALIDATE_PLAN: &str = "validate_plan";

/// Workflow deployment to the platform.
pub const OP_EXECUTE_WORKFLOW: &str = "execute_workflow";
