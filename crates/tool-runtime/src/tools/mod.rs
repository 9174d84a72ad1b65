//! Built-in tool implementations.
//!
//! Both tools are thin HTTP adapters:
//! - **`agent_router`**: forwards a query to the agent-selection service
//! - **`cognee_memory`**: add / search / visualize against a Cognee memory service

pub mod agent_router;
pub mod memory;

pub use agent_router::{AgentRouterTool, CatalogEntry};
pub use memory::CogneeMemoryTool;

use agentlink_core::Config;

use crate::registry::{RegistryError, ToolRegistry};
use crate::tool::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Registry with both built-in tools configured from `config`.
pub fn default_registry(config: &Config) -> Result<ToolRegistry, BuildError> {
    let mut registry = ToolRegistry::new();
    registry.register(AgentRouterTool::new(config.router.clone())?)?;
    registry.register(CogneeMemoryTool::new(config.memory.clone())?)?;
    Ok(registry)
}
