//! Shared domain types for Weft.
//!
//! This crate contains the data shapes exchanged between the pipeline
//! stations: conversation state, structured plans, platform workflow
//! definitions, LLM request/response types, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror,
//! secrecy.

pub mod config;
pub mod error;
pub mod llm;
pub mod plan;
pub mod state;
pub mod workflow;
