//! Conversation state: the shared blackboard the pipeline stations read and
//! update.
//!
//! State is never mutated in place by a station. Each station returns a
//! [`Command`] carrying a [`StateDelta`]; the runtime merges deltas through a
//! fixed reducer (message lists concatenate, scalars overwrite). This keeps
//! the blackboard pattern without implicit globals.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::Plan;

/// The pipeline's operating mode, surfaced to the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Gathering requirements; replies are conversational.
    Chat,
    /// Requirements complete; the pipeline is building a workflow.
    Workflow,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Chat => write!(f, "chat"),
            Mode::Workflow => write!(f, "workflow"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(Mode::Chat),
            "workflow" => Ok(Mode::Workflow),
            other => Err(format!("invalid mode: '{other}'")),
        }
    }
}

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single message in the session's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Structured requirements assessment reported by the enrichment agent.
///
/// The router reads this -- and only this -- to decide whether planning can
/// start. It never re-parses reply text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementsStatus {
    pub has_all_required_info: bool,
    /// Confidence in the assessment, 0..1.
    pub confidence: f64,
    /// What is still missing, when anything is.
    #[serde(default)]
    pub missing_info: Vec<String>,
}

/// Non-blocking guidance for a credential the created workflow still needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialGuidance {
    /// Display name (e.g. "Slack account").
    pub name: String,
    /// Platform credential type identifier (e.g. "slackApi").
    pub kind: String,
    /// Where the user sets the credential up.
    pub setup_url: String,
}

/// The shared conversation state for one session.
///
/// Created per session, discarded on session reset. `workflow_id` being set
/// implies execution succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: Uuid,
    /// Append-only message history.
    pub messages: Vec<ChatMessage>,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<RequirementsStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_guidance: Option<Vec<CredentialGuidance>>,
    /// The clarifying question the run is suspended on, when any. Together
    /// with `session_id` this forms the resumable continuation token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_question: Option<String>,
}

impl ConversationState {
    /// Create a fresh state for a new session.
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            mode: Mode::Chat,
            requirements: None,
            plan: None,
            workflow_id: None,
            credential_guidance: None,
            pending_question: None,
        }
    }

    /// Append a user message (host-side resume entry point).
    pub fn push_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }
}

/// A station in the pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Station {
    Enrichment,
    Planning,
    Execution,
    /// Graph-terminal: the turn is over.
    End,
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Station::Enrichment => write!(f, "enrichment"),
            Station::Planning => write!(f, "planning"),
            Station::Execution => write!(f, "execution"),
            Station::End => write!(f, "end"),
        }
    }
}

/// Partial state update returned by a station.
///
/// `messages` concatenates onto the history; every other field overwrites
/// the corresponding state field when present. `pending_question` is
/// double-optional so a station can explicitly clear it (`Some(None)`)
/// or leave it untouched (`None`).
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub messages: Vec<ChatMessage>,
    pub mode: Option<Mode>,
    pub requirements: Option<RequirementsStatus>,
    pub plan: Option<Plan>,
    pub workflow_id: Option<String>,
    pub credential_guidance: Option<Vec<CredentialGuidance>>,
    pub pending_question: Option<Option<String>>,
}

/// The only inter-station interface: where to go next, and what changed.
///
/// Stations never call each other directly and never mutate state in place.
#[derive(Debug, Clone)]
pub struct Command {
    pub next: Station,
    pub delta: StateDelta,
}

impl Command {
    /// A command routing to `next` with an empty delta.
    pub fn to(next: Station) -> Self {
        Self {
            next,
            delta: StateDelta::default(),
        }
    }

    /// Replace the delta on this command.
    pub fn with_delta(mut self, delta: StateDelta) -> Self {
        self.delta = delta;
        self
    }
}
