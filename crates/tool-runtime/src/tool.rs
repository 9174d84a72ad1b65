use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::artifact::{Artifact, ArtifactStore};
use crate::progress::ProgressSink;

/// Describes a tool's interface for LLM consumption.
/// Maps to Claude's tool format and OpenAI's function format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "agent_router", "cognee_memory")
    pub name: String,
    /// Human-readable description for the LLM
    pub description: String,
    /// JSON Schema describing the expected input
    pub input_schema: Value,
}

/// Represents an LLM requesting execution of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this invocation (used to match results)
    pub id: String,
    /// Tool name to execute
    pub name: String,
    /// JSON input arguments
    pub input: Value,
}

/// Result of executing a tool, sent back to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Must match the ToolCall id
    pub tool_call_id: String,
    /// Result content (text or structured)
    pub content: String,
    /// Whether this result represents an error
    pub is_error: bool,
}

impl ToolResult {
    /// Plain successful result. `tool_call_id` is set by the caller.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            tool_call_id: String::new(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Error result whose content is the JSON object `{"error": msg}`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            tool_call_id: String::new(),
            content: serde_json::json!({ "error": message.into() }).to_string(),
            is_error: true,
        }
    }

    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = id.into();
        self
    }
}

/// Per-invocation context handed to tools by the host.
///
/// Carries the request/session identity used for logging and dataset
/// naming, plus the optional streaming and persistence collaborators.
#[derive(Clone, Default)]
pub struct ToolContext {
    pub request_id: String,
    pub session_id: Option<String>,
    progress: Option<Arc<dyn ProgressSink>>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
}

impl ToolContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_artifacts(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(store);
        self
    }

    /// Request id for log lines; `-` when the host did not provide one.
    pub fn rid(&self) -> &str {
        if self.request_id.is_empty() { "-" } else { &self.request_id }
    }

    /// Non-empty session id, if any.
    pub fn session(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Log a progress line and forward it to the progress sink when present.
    pub fn info(&self, line: &str) {
        if let Some(sink) = &self.progress {
            sink.send(line);
        }
        tracing::info!(request_id = %self.rid(), "{}", line);
    }

    /// Best-effort transcript persistence. Failures are logged, never returned.
    pub async fn persist(&self, base_name: &str, description: &str, content: String) {
        let Some(store) = &self.artifacts else {
            tracing::debug!(request_id = %self.rid(), base_name, "no artifact store, transcript skipped");
            return;
        };
        let artifact = Artifact {
            request_id: if self.request_id.is_empty() {
                "unknown".to_string()
            } else {
                self.request_id.clone()
            },
            file_name: format!("{}.md", crate::artifact::safe_file_name(base_name)),
            description: description.to_string(),
            content,
        };
        match store.save(&artifact).await {
            Ok(path) => self.info(&format!("file saved: {}", path.display())),
            Err(e) => {
                tracing::warn!(request_id = %self.rid(), error = %e, "file upload skipped");
            }
        }
    }
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("request_id", &self.request_id)
            .field("session_id", &self.session_id)
            .field("progress", &self.progress.is_some())
            .field("artifacts", &self.artifacts.is_some())
            .finish()
    }
}

/// The primary extension point: all tools implement this trait.
///
/// Tools are object-safe, Send + Sync, and async. Description and schema
/// are async because adapters may build them from a remote catalog.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name, stable for the lifetime of the tool.
    fn name(&self) -> &str;

    /// Human-readable description for the LLM.
    async fn description(&self) -> String;

    /// JSON Schema describing the expected input.
    async fn input_schema(&self) -> Value;

    /// Returns the tool's definition (name, description, JSON Schema).
    async fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().await,
            input_schema: self.input_schema().await,
        }
    }

    /// Execute the tool with the given JSON input.
    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} {url} => {body}")]
    Remote {
        status: u16,
        url: String,
        body: String,
    },
    #[error("Auth failed: {0}")]
    Auth(String),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Read a named argument as a string the lenient way tool callers expect:
/// missing or `null` reads as `""`, numbers and booleans as their display form.
pub fn arg_str(input: &Value, key: &str) -> String {
    match input.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Read a named argument only when it is a JSON boolean.
pub fn arg_bool(input: &Value, key: &str) -> Option<bool> {
    input.get(key).and_then(Value::as_bool)
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}

/// Simple echo tool for testing purposes.
#[cfg(test)]
pub(crate) struct EchoTool;

#[cfg(test)]
#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    async fn description(&self) -> String {
        "Echoes back the input message. For testing.".to_string()
    }

    async fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo back"
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let message = input
            .get("message")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("missing 'message' field".to_string()))?;

        Ok(ToolResult::text(message))
    }
}
