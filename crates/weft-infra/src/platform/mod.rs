//! Automation platform REST client (n8n-compatible API).

mod client;
mod types;

pub use client::{PlatformClient, PlatformError};
pub use types::{CreatedWorkflow, CredentialSummary, NodeTypeDescription, WorkflowSummary};
