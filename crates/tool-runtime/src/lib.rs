pub mod artifact;
pub mod progress;
pub mod registry;
pub mod tool;
pub mod tools;

pub use artifact::{Artifact, ArtifactError, ArtifactStore, FileArtifactStore};
pub use progress::{CollectingSink, ProgressSink};
pub use registry::{RegistryError, ToolRegistry};
pub use tool::{Tool, ToolCall, ToolContext, ToolDefinition, ToolError, ToolResult};
pub use tools::{default_registry, AgentRouterTool, BuildError, CogneeMemoryTool};
