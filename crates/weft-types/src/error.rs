//! The pipeline error taxonomy.
//!
//! Every variant here is fatal for the current turn and carries the stage it
//! occurred at plus enough raw input to drive correction or user-facing
//! messaging. Tool-level failures are deliberately NOT represented here:
//! they are converted to agent-visible text and fed back into the failing
//! agent's own next inference (see `weft-core::tool`).

use std::fmt;

use thiserror::Error;

use crate::llm::LlmError;

/// Which pipeline stage an error occurred at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Enrichment,
    Planning,
    Validation,
    Execution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Enrichment => write!(f, "enrichment"),
            Stage::Planning => write!(f, "planning"),
            Stage::Validation => write!(f, "validation"),
            Stage::Execution => write!(f, "execution"),
        }
    }
}

/// One field-level problem in a parsed or normalized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the offending field (e.g. "nodes[2].position").
    pub field: String,
    pub message: String,
    /// Suggested fix, suitable for an automatic correction loop.
    pub fix: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        fix: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            fix: fix.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (fix: {})", self.field, self.message, self.fix)
    }
}

/// Fatal pipeline errors. Each aborts the current turn.
#[derive(Debug, Error)]
pub enum WeftError {
    /// Missing required credential or configuration. Surfaced verbatim.
    #[error("configuration error at {stage}: {message}")]
    Configuration { stage: Stage, message: String },

    /// The serialized plan could not be parsed. No auto-retry; the user
    /// must rephrase.
    #[error("could not parse serialized plan at {stage}: {} error(s)", .errors.len())]
    ProtocolParse {
        stage: Stage,
        errors: Vec<FieldError>,
        /// Raw-input excerpt sufficient for diagnosis.
        snippet: String,
    },

    /// Semantically invalid plan that could not be auto-corrected. Carries
    /// the validator model's full explanation.
    #[error("plan failed validation and could not be corrected: {explanation}")]
    Validation { explanation: String },

    /// The validator response carried neither `[VALID]` nor `[INVALID]`.
    #[error("unexpected validator response at {stage} (no verdict sentinel)")]
    UnexpectedProtocol { stage: Stage, snippet: String },

    /// The workflow is structurally invalid even after defaulting.
    #[error("workflow failed normalization with {} field error(s)", .errors.len())]
    Normalization { errors: Vec<FieldError> },

    /// An LLM transport failure, with the stage it interrupted.
    #[error("LLM call failed at {stage}: {source}")]
    Llm {
        stage: Stage,
        #[source]
        source: LlmError,
    },
}

impl WeftError {
    /// Truncate raw input to a diagnosable excerpt.
    pub fn snippet_of(raw: &str) -> String {
        const MAX: usize = 400;
        if raw.len() <= MAX {
            raw.to_string()
        } else {
            let mut end = MAX;
            while !raw.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &raw[..end])
        }
    }
}
