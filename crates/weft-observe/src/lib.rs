//! Observability setup for Weft.
//!
//! Structured tracing initialization plus the OTel GenAI semantic-convention
//! attribute names the agents use on their spans.

pub mod genai_attrs;
pub mod tracing_setup;
