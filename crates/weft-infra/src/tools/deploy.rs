//! Credential-check and workflow-create tools for the execution loop.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use weft_core::normalize::normalize_workflow;
use weft_core::tool::{Tool, ToolError};

use crate::platform::PlatformClient;

#[derive(Debug, Deserialize, JsonSchema)]
struct CredentialQuery {
    /// Platform credential type identifier (e.g. "slackApi").
    kind: String,
}

fn schema_of<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// `check_credentials`: does a credential of this type exist?
///
/// Never blocks workflow creation -- a missing credential comes back as
/// `exists: false` with a setup link, which the execution agent surfaces as
/// guidance.
pub struct CredentialCheckTool {
    client: Arc<PlatformClient>,
}

impl CredentialCheckTool {
    pub fn new(client: Arc<PlatformClient>) -> Self {
        Self { client }
    }
}

impl Tool for CredentialCheckTool {
    fn name(&self) -> &str {
        "check_credentials"
    }

    fn description(&self) -> &str {
        "Check whether a credential of the given type already exists on the \
         platform. Returns its name when present, or a setup link when not."
    }

    fn input_schema(&self) -> serde_json::Value {
        schema_of::<CredentialQuery>()
    }

    async fn call(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let query: CredentialQuery = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let credentials = self
            .client
            .list_credentials()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let existing = credentials.iter().find(|cred| cred.kind == query.kind);
        let result = serde_json::json!({
            "kind": query.kind,
            "exists": existing.is_some(),
            "name": existing.map(|cred| cred.name.clone()),
            "setup_url": format!("{}/credentials/new/{}", self.client.base_url(), query.kind),
        });
        Ok(result.to_string())
    }
}

/// `create_workflow`: submit the workflow definition to the platform.
///
/// The definition is normalized one final time here -- this is the last
/// gate before data reaches the platform, and the model may have mangled
/// the JSON while relaying it. Normalization failures come back as
/// field-level text the agent can act on.
pub struct WorkflowCreateTool {
    client: Arc<PlatformClient>,
}

impl WorkflowCreateTool {
    pub fn new(client: Arc<PlatformClient>) -> Self {
        Self { client }
    }
}

impl Tool for WorkflowCreateTool {
    fn name(&self) -> &str {
        "create_workflow"
    }

    fn description(&self) -> &str {
        "Create the workflow on the automation platform. Pass the workflow \
         definition exactly as given. Returns the created workflow's id."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "workflow": {
                    "type": "object",
                    "description": "The complete workflow definition to create."
                }
            },
            "required": ["workflow"]
        })
    }

    async fn call(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let candidate = workflow_candidate(&input);
        let definition = normalize_workflow(candidate).map_err(|errors| {
            let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ToolError::InvalidInput(format!(
                "workflow failed validation:\n{}",
                details.join("\n")
            ))
        })?;

        let created = self
            .client
            .create_workflow(&definition)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        info!(workflow_id = %created.id, name = %definition.name, "workflow created");
        Ok(serde_json::json!({"id": created.id, "name": definition.name}).to_string())
    }
}

/// Accept both `{"workflow": {...}}` and a bare definition object.
fn workflow_candidate(input: &serde_json::Value) -> &serde_json::Value {
    if input["workflow"].is_object() {
        &input["workflow"]
    } else {
        input
    }
}
