//! Wire types for the automation platform's REST API.

use serde::{Deserialize, Serialize};

/// The platform wraps list responses in a `data` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
}

/// Response to a workflow create/update call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatedWorkflow {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One workflow in a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

/// One stored credential in a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSummary {
    pub id: String,
    pub name: String,
    /// Platform credential type identifier (e.g. "slackApi").
    #[serde(rename = "type")]
    pub kind: String,
}

/// One node type from the platform catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeTypeDescription {
    pub name: String,
    #[serde(default, rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Full type description including parameter properties; opaque here.
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_envelope_deserialization() {
        let json = r#"{"data": [{"id": "1", "name": "wf", "active": true}]}"#;
        let envelope: ListEnvelope<WorkflowSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.len(), 1);
        assert!(envelope.data[0].active);
    }

    #[test]
    fn test_credential_summary_type_field() {
        let json = r#"{"id": "9", "name": "My Slack", "type": "slackApi"}"#;
        let cred: CredentialSummary = serde_json::from_str(json).unwrap();
        assert_eq!(cred.kind, "slackApi");
    }

    #[test]
    fn test_node_type_defaults() {
        let json = r#"{"name": "n8n-nodes-base.cron"}"#;
        let node: NodeTypeDescription = serde_json::from_str(json).unwrap();
        assert_eq!(node.name, "n8n-nodes-base.cron");
        assert_eq!(node.display_name, "");
        assert!(node.properties.is_null());
    }

    #[test]
    fn test_created_workflow_name_defaults() {
        let json = r#"{"id": "wf_1"}"#;
        let created: CreatedWorkflow = serde_json::from_str(json).unwrap();
        assert_eq!(created.id, "wf_1");
        assert_eq!(created.name, "");
    }
}
