//! Infrastructure implementations for Weft.
//!
//! Everything here implements a port defined in `weft-core`: the Anthropic
//! LLM provider, the automation-platform REST client, the platform-backed
//! tools, and configuration loading. `weft-core` never depends on this
//! crate.

pub mod config;
pub mod llm;
pub mod platform;
pub mod tools;
