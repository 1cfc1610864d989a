//! Plan converter: loosely-typed parsed payload -> [`Plan`].
//!
//! Total and defensive by design -- the input originates from an LLM.
//! Missing title/summary get string defaults, credential entries default
//! missing fields to empty strings, and a missing workflow becomes an empty
//! definition named after the plan. Never fails; structural problems are
//! the schema normalizer's job.

use serde_json::Value;

use weft_types::plan::{Plan, PlanCredential};
use weft_types::workflow::WorkflowDefinition;

use crate::normalize::coerce_workflow;

/// Default title for payloads that lost theirs.
const UNTITLED: &str = "Untitled workflow";

/// Convert a parsed Loom payload into a structured plan.
pub fn convert_plan(payload: &Value) -> Plan {
    let title = payload["title"]
        .as_str()
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();
    let summary = payload["summary"].as_str().unwrap_or_default().to_string();

    let workflow = match payload.get("workflow") {
        Some(candidate) if candidate.is_object() => coerce_workflow(candidate, &title),
        _ => WorkflowDefinition {
            name: title.clone(),
            active: false,
            nodes: Vec::new(),
            connections: Default::default(),
            settings: Default::default(),
        },
    };

    Plan {
        title,
        summary,
        credentials_needed: convert_credentials(&payload["credentials_needed"]),
        credentials_available: convert_credentials(&payload["credentials_available"]),
        workflow,
    }
}

fn convert_credentials(value: &Value) -> Vec<PlanCredential> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| PlanCredential {
                    kind: string_field(entry, &["type", "kind"]),
                    name: string_field(entry, &["name"]),
                    required_for: string_field(entry, &["required_for", "requiredFor", "for"]),
                    node_id: string_field(entry, &["node_id", "nodeId"]),
                    node_name: string_field(entry, &["node_name", "nodeName"]),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// First present string among aliases, else empty.
fn string_field(entry: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| entry[*key].as_str())
        .unwrap_or_default()
        .to_string()
}
