//! Loom writer: `Plan` -> compact text.

use std::fmt::Write as _;

use weft_types::plan::{Plan, PlanCredential};
use weft_types::workflow::WorkflowNode;

/// Serialize a plan into Loom text.
///
/// Output is deterministic: nodes in definition order, connections in
/// source-name order (the definition's `BTreeMap` ordering), ports and
/// items in index order.
pub fn format_plan(plan: &Plan) -> String {
    let mut out = String::new();

    out.push_str("@plan\n");
    let _ = writeln!(out, "title: {}", escape_text(&plan.title));
    let _ = writeln!(out, "summary: {}", escape_text(&plan.summary));

    write_credentials(&mut out, "needed", &plan.credentials_needed);
    write_credentials(&mut out, "available", &plan.credentials_available);

    let wf = &plan.workflow;
    let _ = writeln!(out, "@workflow {} | active={}", escape_text(&wf.name), wf.active);

    for node in &wf.nodes {
        write_node(&mut out, node);
    }

    for (source, ports) in &wf.connections {
        for (port, items) in ports.main.iter().enumerate() {
            for item in items {
                let _ = writeln!(
                    out,
                    "@connect {} #{} -> {} @{}",
                    escape_text(source),
                    port,
                    escape_text(&item.node),
                    item.index
                );
            }
        }
    }

    for (key, value) in &wf.settings {
        let _ = writeln!(out, "@settings {key} = {value}");
    }

    out.push_str("@end\n");
    out
}

fn write_credentials(out: &mut String, section: &str, credentials: &[PlanCredential]) {
    if credentials.is_empty() {
        return;
    }
    let _ = writeln!(out, "@credentials {section}");
    for cred in credentials {
        let mut line = format!("- kind={}", escape_field(&cred.kind));
        if !cred.name.is_empty() {
            let _ = write!(line, "; name={}", escape_field(&cred.name));
        }
        if !cred.required_for.is_empty() {
            let _ = write!(line, "; for={}", escape_field(&cred.required_for));
        }
        if !cred.node_id.is_empty() {
            let _ = write!(line, "; node_id={}", escape_field(&cred.node_id));
        }
        if !cred.node_name.is_empty() {
            let _ = write!(line, "; node_name={}", escape_field(&cred.node_name));
        }
        let _ = writeln!(out, "{line}");
    }
}

fn write_node(out: &mut String, node: &WorkflowNode) {
    let _ = writeln!(
        out,
        "@node {} | {} | {} | v{} | ({},{})",
        escape_text(&node.id),
        escape_text(&node.name),
        escape_text(&node.kind),
        node.type_version,
        node.position[0],
        node.position[1]
    );
    for (key, value) in &node.parameters {
        let _ = writeln!(out, "  param {key} = {value}");
    }
    if let Some(credentials) = &node.credentials {
        for (kind, reference) in credentials {
            let _ = writeln!(out, "  cred {kind} = {reference}");
        }
    }
}

/// Escape newlines, backslashes, and the `|` segment separator so every
/// value stays on one line and never splits a header.
pub(super) fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('|', "\\|")
}

/// Field values additionally escape the `;` pair separator.
fn escape_field(text: &str) -> String {
    escape_text(text).replace(';', "\\;")
}
