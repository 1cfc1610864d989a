//! Deterministic, model-free routing over conversation state.
//!
//! The router is the only place that decides which agent runs next. It reads
//! the structured `requirements` field exclusively -- never message text --
//! so the enrichment agent's side-channel report is the single source of
//! routing truth.

use tracing::debug;

use weft_types::state::{Command, ConversationState, Mode, Station};

/// Select the next station for the current state.
///
/// Routing rules:
/// - no requirements status yet -> enrichment, chat mode
/// - complete requirements with confidence strictly above `threshold`
///   -> planning, workflow mode
/// - anything else -> enrichment, chat mode
///
/// The comparison is strict: a status at exactly `threshold` stays in chat.
pub fn route(state: &ConversationState, threshold: f64) -> Command {
    let (next, mode) = match &state.requirements {
        Some(status) if status.has_all_required_info && status.confidence > threshold => {
            (Station::Planning, Mode::Workflow)
        }
        _ => (Station::Enrichment, Mode::Chat),
    };

    debug!(
        session_id = %state.session_id,
        next = %next,
        mode = %mode,
        "routed"
    );

    let mut cmd = Command::to(next);
    cmd.delta.mode = Some(mode);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use weft_types::state::RequirementsStatus;

    const THRESHOLD: f64 = 0.8;

    fn state_with(requirements: Option<RequirementsStatus>) -> ConversationState {
        let mut state = ConversationState::new(Uuid::now_v7());
        state.requirements = requirements;
        state
    }

    fn status(has_all: bool, confidence: f64) -> RequirementsStatus {
        RequirementsStatus {
            has_all_required_info: has_all,
            confidence,
            missing_info: Vec::new(),
        }
    }

    #[test]
    fn test_absent_status_routes_to_enrichment() {
        let cmd = route(&state_with(None), THRESHOLD);
        assert_eq!(cmd.next, Station::Enrichment);
        assert_eq!(cmd.delta.mode, Some(Mode::Chat));
    }

    #[test]
    fn test_complete_and_confident_routes_to_planning() {
        let cmd = route(&state_with(Some(status(true, 0.95))), THRESHOLD);
        assert_eq!(cmd.next, Station::Planning);
        assert_eq!(cmd.delta.mode, Some(Mode::Workflow));
    }

    #[test]
    fn test_incomplete_routes_to_enrichment() {
        let cmd = route(&state_with(Some(status(false, 0.99))), THRESHOLD);
        assert_eq!(cmd.next, Station::Enrichment);
        assert_eq!(cmd.delta.mode, Some(Mode::Chat));
    }

    #[test]
    fn test_low_confidence_routes_to_enrichment() {
        let cmd = route(&state_with(Some(status(true, 0.5))), THRESHOLD);
        assert_eq!(cmd.next, Station::Enrichment);
    }

    #[test]
    fn test_threshold_is_strict_greater_than() {
        // Exactly 0.8 does not qualify
        let cmd = route(&state_with(Some(status(true, 0.8))), THRESHOLD);
        assert_eq!(cmd.next, Station::Enrichment);
        assert_eq!(cmd.delta.mode, Some(Mode::Chat));

        // Just above does
        let cmd = route(&state_with(Some(status(true, 0.800_001))), THRESHOLD);
        assert_eq!(cmd.next, Station::Planning);
    }

    #[test]
    fn test_custom_threshold_respected() {
        let cmd = route(&state_with(Some(status(true, 0.85))), 0.9);
        assert_eq!(cmd.next, Station::Enrichment);

        let cmd = route(&state_with(Some(status(true, 0.95))), 0.9);
        assert_eq!(cmd.next, Station::Planning);
    }
}
