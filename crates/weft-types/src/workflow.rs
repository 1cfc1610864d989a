//! Platform workflow definition types.
//!
//! These model the automation platform's workflow document: a named graph of
//! typed nodes plus a connections map keyed by source node *name*. The JSON
//! field names (`typeVersion`, `parameters`, ...) follow the platform's wire
//! format, so a normalized definition serializes directly into a valid
//! create-workflow request body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A workflow document ready for submission to the automation platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub nodes: Vec<WorkflowNode>,
    /// Source node name -> output ports. BTreeMap keeps serialization
    /// deterministic.
    #[serde(default)]
    pub connections: BTreeMap<String, NodeConnections>,
    /// Opaque platform settings, passed through untouched.
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

/// A single node in a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique identifier within the workflow.
    pub id: String,
    /// Display name; unique within the workflow and used as the connection key.
    pub name: String,
    /// Platform node-type identifier (e.g. "n8n-nodes-base.slack").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "typeVersion")]
    pub type_version: f64,
    /// Canvas position, exactly two numbers.
    pub position: [f64; 2],
    /// Opaque node parameters, passed through untouched.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Credential-type -> credential reference, when the node needs any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<BTreeMap<String, serde_json::Value>>,
}

/// The output ports of one source node.
///
/// `main[port][i]` is the i-th connection leaving output port `port`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeConnections {
    #[serde(default)]
    pub main: Vec<Vec<ConnectionItem>>,
}

/// One edge in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionItem {
    /// Target node *name*.
    pub node: String,
    /// Port type; the platform only uses "main".
    #[serde(rename = "type", default = "default_port_type")]
    pub port_type: String,
    /// Target input port index.
    #[serde(default)]
    pub index: u32,
}

fn default_port_type() -> String {
    "main".to_string()
}

impl ConnectionItem {
    /// A main-port connection to `node` at input index `index`.
    pub fn main(node: impl Into<String>, index: u32) -> Self {
        Self {
            node: node.into(),
            port_type: default_port_type(),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> WorkflowNode {
        WorkflowNode {
            id: "a1".to_string(),
            name: "Cron".to_string(),
            kind: "n8n-nodes-base.cron".to_string(),
            type_version: 1.0,
            position: [250.0, 300.0],
            parameters: serde_json::Map::new(),
            credentials: None,
        }
    }

    #[test]
    fn test_node_serializes_platform_field_names() {
        let json = serde_json::to_value(sample_node()).unwrap();
        assert_eq!(json["type"], "n8n-nodes-base.cron");
        assert_eq!(json["typeVersion"], 1.0);
        assert_eq!(json["position"], serde_json::json!([250.0, 300.0]));
        // Optional credentials are omitted entirely
        assert!(json.get("credentials").is_none());
    }

    #[test]
    fn test_connection_item_defaults() {
        let json = r#"{"node": "Slack"}"#;
        let item: ConnectionItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.node, "Slack");
        assert_eq!(item.port_type, "main");
        assert_eq!(item.index, 0);
    }

    #[test]
    fn test_workflow_definition_roundtrip() {
        let mut connections = BTreeMap::new();
        connections.insert(
            "Cron".to_string(),
            NodeConnections {
                main: vec![vec![ConnectionItem::main("Slack", 0)]],
            },
        );
        let def = WorkflowDefinition {
            name: "morning-briefing".to_string(),
            active: false,
            nodes: vec![sample_node()],
            connections,
            settings: serde_json::Map::new(),
        };

        let json = serde_json::to_string(&def).unwrap();
        let back: WorkflowDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(def, back);
    }

    #[test]
    fn test_workflow_definition_defaults() {
        let json = r#"{"name": "wf", "nodes": []}"#;
        let def: WorkflowDefinition = serde_json::from_str(json).unwrap();
        assert!(!def.active);
        assert!(def.connections.is_empty());
        assert!(def.settings.is_empty());
    }
}
