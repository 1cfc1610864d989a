//! Node-type catalog and documentation lookups for the planning loop.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use weft_core::tool::{Tool, ToolError};

use crate::platform::{NodeTypeDescription, PlatformClient};

/// Cap on catalog entries returned to the model in one call.
const CATALOG_LIMIT: usize = 100;

#[derive(Debug, Deserialize, JsonSchema)]
struct CatalogQuery {
    /// Case-insensitive substring filter on node type names.
    #[serde(default)]
    search: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DocsQuery {
    /// Full platform node type identifier (e.g. "n8n-nodes-base.slack").
    kind: String,
}

fn schema_of<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// `fetch_node_catalog`: list available node types.
pub struct NodeCatalogTool {
    client: Arc<PlatformClient>,
}

impl NodeCatalogTool {
    pub fn new(client: Arc<PlatformClient>) -> Self {
        Self { client }
    }
}

impl Tool for NodeCatalogTool {
    fn name(&self) -> &str {
        "fetch_node_catalog"
    }

    fn description(&self) -> &str {
        "List the node types available on the automation platform, optionally \
         filtered by a search term. Use this to find the right node type \
         identifiers before planning."
    }

    fn input_schema(&self) -> serde_json::Value {
        schema_of::<CatalogQuery>()
    }

    async fn call(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let query: CatalogQuery = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let node_types = self
            .client
            .get_node_types()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(render_catalog(&node_types, query.search.as_deref()))
    }
}

/// Format catalog entries as compact lines, applying the search filter and
/// the entry cap.
fn render_catalog(node_types: &[NodeTypeDescription], search: Option<&str>) -> String {
    let needle = search.unwrap_or("").to_lowercase();
    let matching: Vec<&NodeTypeDescription> = node_types
        .iter()
        .filter(|node| {
            needle.is_empty()
                || node.name.to_lowercase().contains(&needle)
                || node.display_name.to_lowercase().contains(&needle)
        })
        .collect();

    if matching.is_empty() {
        return "No node types match.".to_string();
    }

    let total = matching.len();
    let mut lines: Vec<String> = matching
        .into_iter()
        .take(CATALOG_LIMIT)
        .map(|node| {
            if node.description.is_empty() {
                format!("{} ({})", node.name, node.display_name)
            } else {
                format!("{} ({}): {}", node.name, node.display_name, node.description)
            }
        })
        .collect();
    if total > CATALOG_LIMIT {
        lines.push(format!(
            "... {} more; narrow with the search parameter",
            total - CATALOG_LIMIT
        ));
    }
    lines.join("\n")
}

/// `fetch_node_docs`: parameter documentation for one node type.
pub struct NodeDocsTool {
    client: Arc<PlatformClient>,
}

impl NodeDocsTool {
    pub fn new(client: Arc<PlatformClient>) -> Self {
        Self { client }
    }
}

impl Tool for NodeDocsTool {
    fn name(&self) -> &str {
        "fetch_node_docs"
    }

    fn description(&self) -> &str {
        "Fetch the parameter documentation for one node type. Use this to \
         fill in node parameters correctly."
    }

    fn input_schema(&self) -> serde_json::Value {
        schema_of::<DocsQuery>()
    }

    async fn call(&self, input: serde_json::Value) -> Result<String, ToolError> {
        let query: DocsQuery = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let node_types = self
            .client
            .get_node_types()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let node = node_types
            .iter()
            .find(|node| node.name == query.kind)
            .ok_or_else(|| {
                ToolError::Execution(format!(
                    "unknown node type '{}'; check fetch_node_catalog",
                    query.kind
                ))
            })?;

        Ok(render_docs(node))
    }
}

fn render_docs(node: &NodeTypeDescription) -> String {
    let properties = serde_json::to_string_pretty(&node.properties)
        .unwrap_or_else(|_| node.properties.to_string());
    format!(
        "{} ({})\n{}\n\nProperties:\n{properties}",
        node.name, node.display_name, node.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, display: &str, description: &str) -> NodeTypeDescription {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "displayName": display,
            "description": description,
        }))
        .unwrap()
    }

    #[test]
    fn test_render_catalog_filters_by_search() {
        let nodes = vec![
            node("n8n-nodes-base.slack", "Slack", "Post messages"),
            node("n8n-nodes-base.cron", "Cron", "Time trigger"),
        ];
        let text = render_catalog(&nodes, Some("slack"));
        assert!(text.contains("n8n-nodes-base.slack"));
        assert!(!text.contains("cron"));
    }

    #[test]
    fn test_render_catalog_no_matches() {
        let nodes = vec![node("n8n-nodes-base.cron", "Cron", "")];
        assert_eq!(render_catalog(&nodes, Some("jira")), "No node types match.");
    }

    #[test]
    fn test_render_catalog_caps_output() {
        let nodes: Vec<NodeTypeDescription> = (0..150)
            .map(|i| node(&format!("n8n-nodes-base.n{i}"), "N", ""))
            .collect();
        let text = render_catalog(&nodes, None);
        assert!(text.contains("50 more"));
    }

    #[test]
    fn test_render_docs_includes_properties() {
        let mut n = node("n8n-nodes-base.slack", "Slack", "Post messages");
        n.properties = serde_json::json!([{"name": "channel", "type": "string"}]);
        let text = render_docs(&n);
        assert!(text.contains("Slack"));
        assert!(text.contains("channel"));
    }

    #[test]
    fn test_query_schemas_have_expected_fields() {
        let catalog = schema_of::<CatalogQuery>();
        assert!(catalog["properties"].get("search").is_some());
        let docs = schema_of::<DocsQuery>();
        assert!(docs["properties"].get("kind").is_some());
    }
}
