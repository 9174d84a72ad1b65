use crate::tool::{Tool, ToolCall, ToolContext, ToolDefinition, ToolResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Manages available tools, their schemas, and lookup.
/// Thread-safe via Arc wrapping of individual tools.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Returns error if name already registered.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// List all registered tool definitions (for sending to LLM).
    pub async fn list(&self) -> Vec<ToolDefinition> {
        let mut defs = Vec::with_capacity(self.tools.len());
        for tool in self.tools.values() {
            defs.push(tool.definition().await);
        }
        defs
    }

    /// Execute a call against the named tool.
    ///
    /// Never fails: an unknown tool or a tool error comes back as an
    /// error result carrying the call id.
    pub async fn invoke(&self, call: &ToolCall, context: &ToolContext) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            warn!(request_id = %context.rid(), tool = %call.name, "unknown tool");
            return ToolResult::error(format!("unknown tool: {}", call.name)).with_call_id(&call.id);
        };

        let started = Instant::now();
        let result = match tool.execute(call.input.clone(), context).await {
            Ok(result) => result,
            Err(e) => {
                warn!(request_id = %context.rid(), tool = %call.name, error = %e, "tool failed");
                ToolResult::error(e.to_string())
            }
        };

        debug!(
            request_id = %context.rid(),
            tool = %call.name,
            is_error = result.is_error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool call finished"
        );
        result.with_call_id(&call.id)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool with name '{0}' is already registered")]
    DuplicateName(String),
}
