//! Schema normalizer: the deterministic safety net in front of the
//! automation platform.
//!
//! Takes an untrusted candidate workflow definition (LLM-shaped JSON) and
//! either coerces it into a platform-valid [`WorkflowDefinition`] or reports
//! field-level errors. Runs unconditionally before any data reaches the
//! platform, regardless of the LLM validator's verdict.
//!
//! Defaulting is never an error; only four conditions are hard failures:
//! empty workflow name, zero nodes, duplicate node names, and connections
//! referencing unknown node names. Errors are deduplicated to one per field
//! and ordered by significance (workflow-level, then name, nodes,
//! connections, settings).

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use uuid::Uuid;

use weft_types::error::FieldError;
use weft_types::workflow::{ConnectionItem, NodeConnections, WorkflowDefinition, WorkflowNode};

/// Normalize a candidate workflow, or report what cannot be defaulted.
///
/// Idempotent: normalizing an already-normalized workflow yields an
/// identical result.
pub fn normalize_workflow(candidate: &Value) -> Result<WorkflowDefinition, Vec<FieldError>> {
    let def = coerce_workflow(candidate, "");
    let errors = hard_failures(&def);
    if errors.is_empty() {
        Ok(def)
    } else {
        Err(errors)
    }
}

// ---------------------------------------------------------------------------
// Coercion (total; shared with the plan converter)
// ---------------------------------------------------------------------------

/// Best-effort coercion of a candidate into a typed definition.
///
/// Never fails: everything defaultable is defaulted, and structurally
/// hopeless pieces collapse to empty values the hard checks then catch.
pub(crate) fn coerce_workflow(candidate: &Value, fallback_name: &str) -> WorkflowDefinition {
    let name = candidate["name"]
        .as_str()
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback_name)
        .to_string();

    let nodes: Vec<WorkflowNode> = candidate["nodes"]
        .as_array()
        .map(|entries| {
            let mut seen_ids = HashSet::new();
            entries
                .iter()
                .filter(|entry| entry.is_object())
                .map(|entry| coerce_node(entry, &mut seen_ids))
                .collect()
        })
        .unwrap_or_default();

    let connections = candidate["connections"]
        .as_object()
        .map(|entries| {
            entries
                .iter()
                .map(|(source, ports)| (source.clone(), coerce_connections_entry(ports)))
                .collect()
        })
        .unwrap_or_default();

    WorkflowDefinition {
        name,
        active: coerce_bool(&candidate["active"]),
        nodes,
        connections,
        settings: candidate["settings"]
            .as_object()
            .cloned()
            .unwrap_or_default(),
    }
}

fn coerce_node(entry: &Value, seen_ids: &mut HashSet<String>) -> WorkflowNode {
    // Missing, non-string, or duplicate id: mint a fresh unique one.
    let id = match entry["id"].as_str() {
        Some(id) if !id.is_empty() && !seen_ids.contains(id) => id.to_string(),
        _ => Uuid::now_v7().simple().to_string(),
    };
    seen_ids.insert(id.clone());

    WorkflowNode {
        id,
        name: entry["name"].as_str().unwrap_or_default().to_string(),
        kind: entry["type"].as_str().unwrap_or_default().to_string(),
        type_version: coerce_number(&entry["typeVersion"]).unwrap_or(1.0),
        position: coerce_position(&entry["position"]),
        parameters: entry["parameters"].as_object().cloned().unwrap_or_default(),
        credentials: entry["credentials"].as_object().map(|creds| {
            creds
                .iter()
                .map(|(kind, reference)| (kind.clone(), reference.clone()))
                .collect::<BTreeMap<_, _>>()
        }),
    }
}

/// Coerce a position into a numeric pair; `[0,0]` when uncoercible.
fn coerce_position(value: &Value) -> [f64; 2] {
    let Some(entries) = value.as_array() else {
        return [0.0, 0.0];
    };
    if entries.len() != 2 {
        return [0.0, 0.0];
    }
    match (coerce_number(&entries[0]), coerce_number(&entries[1])) {
        (Some(x), Some(y)) => [x, y],
        _ => [0.0, 0.0],
    }
}

/// A number, or a string containing one.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Normalize one connections entry to the double-nested array-of-arrays.
///
/// Accepts the canonical `{"main": [[item, ...], ...]}`, a bare item
/// object, a single-nested item list, or those same shapes directly under
/// the entry (no "main" wrapper).
fn coerce_connections_entry(value: &Value) -> NodeConnections {
    let ports = match value.as_object() {
        Some(obj) if obj.contains_key("main") => &value["main"],
        Some(_) => value, // bare item object
        None => value,    // list shapes
    };

    let main = match ports {
        // Bare object: a single connection item.
        Value::Object(_) => vec![vec![coerce_connection_item(ports)]],
        Value::Array(entries) => {
            if entries.iter().all(Value::is_array) {
                // Already double-nested.
                entries
                    .iter()
                    .map(|port| {
                        port.as_array()
                            .map(|items| items.iter().map(coerce_connection_item).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            } else {
                // Single-nested: one output port holding these items.
                vec![entries.iter().map(coerce_connection_item).collect()]
            }
        }
        _ => Vec::new(),
    };

    NodeConnections { main }
}

fn coerce_connection_item(value: &Value) -> ConnectionItem {
    ConnectionItem {
        node: value["node"].as_str().unwrap_or_default().to_string(),
        port_type: value["type"]
            .as_str()
            .filter(|t| !t.is_empty())
            .unwrap_or("main")
            .to_string(),
        index: value["index"].as_u64().unwrap_or(0) as u32,
    }
}

// ---------------------------------------------------------------------------
// Hard failures
// ---------------------------------------------------------------------------

fn hard_failures(def: &WorkflowDefinition) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if def.name.is_empty() {
        errors.push(FieldError::new(
            "name",
            "workflow name must not be empty",
            "set a non-empty workflow name",
        ));
    }

    if def.nodes.is_empty() {
        errors.push(FieldError::new(
            "nodes",
            "workflow has no nodes",
            "add at least one node",
        ));
    }

    let mut seen_names = HashSet::new();
    for (i, node) in def.nodes.iter().enumerate() {
        if !seen_names.insert(node.name.as_str()) {
            errors.push(FieldError::new(
                format!("nodes[{i}].name"),
                format!("duplicate node name '{}'", node.name),
                "make node names unique within the workflow",
            ));
        }
    }

    let node_names: HashSet<&str> = def.nodes.iter().map(|n| n.name.as_str()).collect();
    for (source, ports) in &def.connections {
        if !node_names.contains(source.as_str()) {
            errors.push(FieldError::new(
                format!("connections.{source}"),
                format!("connection source '{source}' is not a node name"),
                "reference an existing node name or remove the entry",
            ));
        }
        for (port, items) in ports.main.iter().enumerate() {
            for (i, item) in items.iter().enumerate() {
                if !node_names.contains(item.node.as_str()) {
                    errors.push(FieldError::new(
                        format!("connections.{source}.main[{port}][{i}].node"),
                        format!("connection target '{}' is not a node name", item.node),
                        "reference an existing node name or remove the connection",
                    ));
                }
            }
        }
    }

    order_and_dedup(errors)
}

/// One error per field, ordered by significance.
fn order_and_dedup(errors: Vec<FieldError>) -> Vec<FieldError> {
    fn rank(field: &str) -> u8 {
        if field == "name" {
            1
        } else if field.starts_with("nodes") {
            2
        } else if field.starts_with("connections") {
            3
        } else if field.starts_with("settings") {
            4
        } else {
            0 // workflow-level
        }
    }

    let mut ranked: Vec<(usize, FieldError)> = errors.into_iter().enumerate().collect();
    ranked.sort_by_key(|(i, err)| (rank(&err.field), *i));

    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .map(|(_, err)| err)
        .filter(|err| seen.insert(err.field.clone()))
        .collect()
}
