//! The LLM-backed pipeline stations.
//!
//! Each agent receives an immutable state snapshot and returns a
//! [`weft_types::state::Command`]; none of them mutate state or call each
//! other directly. Enrichment gathers requirements, planning produces the
//! plan through a bounded tool loop, execution deploys it to the platform.

pub mod enrichment;
pub mod execution;
pub mod planning;

use weft_types::llm::Message;
use weft_types::state::{ChatRole, ConversationState};

/// One-way, non-blocking channel for streaming reply tokens to the caller.
///
/// Dropping the receiver never affects control flow; sends are fire-and-forget.
pub type TokenSink = tokio::sync::mpsc::UnboundedSender<String>;

/// Map the session history into provider messages.
pub(crate) fn history_messages(state: &ConversationState) -> Vec<Message> {
    state
        .messages
        .iter()
        .map(|msg| match msg.role {
            ChatRole::User => Message::user(msg.content.clone()),
            ChatRole::Assistant => Message::assistant(msg.content.clone()),
        })
        .collect()
}
