//! The structured plan: the planning agent's proposal for an automation.
//!
//! A plan wraps a platform [`WorkflowDefinition`] together with the
//! human-facing title/summary and the credential inventory the workflow
//! depends on. Plans are created by the planning agent, may be wholesale
//! replaced once by the validation auto-fix step, and are read-only
//! afterwards.

use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowDefinition;

/// A proposed automation: what it does, what it needs, and the workflow
/// document that implements it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub title: String,
    pub summary: String,
    /// Credentials the workflow requires but the user may not have yet.
    #[serde(default)]
    pub credentials_needed: Vec<PlanCredential>,
    /// Credentials already present on the platform.
    #[serde(default)]
    pub credentials_available: Vec<PlanCredential>,
    pub workflow: WorkflowDefinition,
}

/// One credential referenced by a plan.
///
/// Only `kind` is always meaningful; the remaining fields default to empty
/// strings because the planning LLM frequently omits them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanCredential {
    /// Platform credential type identifier (e.g. "slackApi").
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    /// What the credential is needed for, in user terms.
    #[serde(default)]
    pub required_for: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub node_name: String,
}

impl PlanCredential {
    /// A credential entry carrying only its type.
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }
}
