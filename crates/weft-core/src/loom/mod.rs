//! Loom: the compact textual protocol for exchanging plans with the
//! planning LLM.
//!
//! A line-oriented key/value format chosen over generic JSON to cut token
//! cost and reduce LLM formatting mistakes. Two pure operations:
//! [`format::format_plan`] and [`parse::parse_plan`]. The parser never
//! panics; it reports field-level errors. Round-trip holds for every valid
//! plan: `parse(format(p))` is structurally equivalent to `p`.
//!
//! Document shape:
//!
//! ```text
//! @plan
//! title: Morning briefing
//! summary: Posts the weather to Slack every morning.
//! @credentials needed
//! - kind=slackApi; name=Slack account; for=posting; node_id=a2; node_name=Slack
//! @credentials available
//! - kind=httpBasicAuth
//! @workflow Morning briefing | active=false
//! @node a1 | Cron | n8n-nodes-base.cron | v1 | (250,300)
//!   param triggerTimes = {"hour":8}
//! @node a2 | Slack | n8n-nodes-base.slack | v2.1 | (450,300)
//!   param channel = "#general"
//!   cred slackApi = {"id":"1"}
//! @connect Cron #0 -> Slack @0
//! @settings timezone = "Europe/Berlin"
//! @end
//! ```
//!
//! Fence-stripping is the caller's responsibility, performed before
//! `parse_plan` (see [`strip_fences`]).

pub mod format;
pub mod parse;

pub use format::format_plan;
pub use parse::{parse_plan, ParseOutcome};

/// Remove wrapping code-block markers from an LLM answer.
///
/// If the text contains a fenced block, the content of the first fence is
/// returned (the language tag, if any, is dropped). Otherwise the trimmed
/// text is returned unchanged.
pub fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed.to_string();
    };

    let after_open = &trimmed[open + 3..];
    // Skip the optional language tag on the opening fence line.
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];

    match body.find("```") {
        Some(close) => body[..close].trim().to_string(),
        None => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_plain_text_passthrough() {
        assert_eq!(strip_fences("  @plan\n@end  "), "@plan\n@end");
    }

    #[test]
    fn test_strip_fences_removes_markers() {
        let text = "```\n@plan\ntitle: x\n@end\n```";
        assert_eq!(strip_fences(text), "@plan\ntitle: x\n@end");
    }

    #[test]
    fn test_strip_fences_drops_language_tag() {
        let text = "```loom\n@plan\n@end\n```";
        assert_eq!(strip_fences(text), "@plan\n@end");
    }

    #[test]
    fn test_strip_fences_ignores_surrounding_prose() {
        let text = "Here is the plan:\n```\n@plan\ntitle: x\n@end\n```\nLet me know!";
        assert_eq!(strip_fences(text), "@plan\ntitle: x\n@end");
    }

    #[test]
    fn test_strip_fences_unclosed_fence() {
        let text = "```\n@plan\n@end";
        assert_eq!(strip_fences(text), "@plan\n@end");
    }
}
