//! The fixed state reducer.
//!
//! Stations receive an immutable snapshot of the conversation state and
//! return a `StateDelta`; this reducer is the only code that merges deltas
//! back in. Message lists concatenate; every other field overwrites when the
//! delta carries a value.

use weft_types::state::{ConversationState, StateDelta};

/// Merge a delta into a state snapshot, producing the next state.
pub fn apply_delta(mut state: ConversationState, delta: StateDelta) -> ConversationState {
    state.messages.extend(delta.messages);

    if let Some(mode) = delta.mode {
        state.mode = mode;
    }
    if let Some(requirements) = delta.requirements {
        state.requirements = Some(requirements);
    }
    if let Some(plan) = delta.plan {
        state.plan = Some(plan);
    }
    if let Some(workflow_id) = delta.workflow_id {
        state.workflow_id = Some(workflow_id);
    }
    if let Some(guidance) = delta.credential_guidance {
        state.credential_guidance = Some(guidance);
    }
    if let Some(pending) = delta.pending_question {
        state.pending_question = pending;
    }

    state
}
