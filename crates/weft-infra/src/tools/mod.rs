//! Platform-backed tool implementations.
//!
//! These implement the `weft_core::tool::Tool` contract on top of
//! [`PlatformClient`]: node-catalog and node-docs lookups for the planning
//! loop, credential checks and workflow creation for the execution loop.

mod catalog;
mod deploy;

pub use catalog::{NodeCatalogTool, NodeDocsTool};
pub use deploy::{CredentialCheckTool, WorkflowCreateTool};

use std::sync::Arc;

use weft_core::tool::ToolSet;

use crate::platform::PlatformClient;

/// The planning agent's platform tools (catalog + docs).
///
/// The pipeline adds `validate_plan` on top of these.
pub fn planning_toolset(client: Arc<PlatformClient>) -> ToolSet {
    ToolSet::new()
        .register(NodeCatalogTool::new(client.clone()))
        .register(NodeDocsTool::new(client))
}

/// The execution agent's platform tools (credential check + create).
pub fn execution_toolset(client: Arc<PlatformClient>) -> ToolSet {
    ToolSet::new()
        .register(CredentialCheckTool::new(client.clone()))
        .register(WorkflowCreateTool::new(client))
}
