//! Agent router tool.
//!
//! Forwards a user query to the agent-selection service, which picks the
//! best downstream agent, calls it, and answers with text. The tool's
//! description and schema are built from the service's live catalog so
//! the LLM can see which agents exist.

use std::time::Instant;

use agentlink_core::RouterConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::tool::{arg_bool, arg_str, Tool, ToolContext, ToolError, ToolResult};

const DEFAULT_DESCRIPTION: &str = "Routes the user's question to the most suitable downstream agent \
(workflow or remote agent), calls that agent's API and returns its answer. \
Required: query. Optional: preferred_agent, force_reload.";

/// One agent as listed by `GET /api/catalog`. Every field is optional
/// upstream; missing values read as empty strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub category: String,
    pub version: String,
    pub model: String,
    /// `api.url` for plain agents, `api.invoke_url` for workflows.
    pub api_url: String,
    pub description: String,
    pub skills: Vec<String>,
}

impl CatalogEntry {
    fn from_value(item: &Value) -> Self {
        let api_url = item
            .get("api")
            .map(|api| {
                let url = str_field(api, "url");
                if url.is_empty() {
                    str_field(api, "invoke_url")
                } else {
                    url
                }
            })
            .unwrap_or_default();

        let skills = item
            .get("skills")
            .and_then(Value::as_array)
            .map(|skills| {
                skills
                    .iter()
                    .map(|s| str_field(s, "name"))
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: str_field(item, "name"),
            category: str_field(item, "category"),
            version: str_field(item, "version"),
            model: str_field(item, "model"),
            api_url,
            description: str_field(item, "description"),
            skills,
        }
    }
}

/// Routes queries through the agent-selection service.
pub struct AgentRouterTool {
    config: RouterConfig,
    http: reqwest::Client,
}

impl AgentRouterTool {
    pub fn new(config: RouterConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .timeout(config.call_timeout())
            .build()?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, ToolError> {
        let url = self.url(path);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ToolError::Remote {
                status: status.as_u16(),
                url,
                body,
            });
        }
        serde_json::from_str(&body)
            .map_err(|e| ToolError::ExecutionFailed(format!("invalid JSON from {url}: {e}")))
    }

    /// POST a JSON body. A 2xx body that is not JSON comes back as `{"raw": body}`.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ToolError> {
        let url = self.url(path);
        let resp = self.http.post(&url).json(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ToolError::Remote {
                status: status.as_u16(),
                url,
                body: text,
            });
        }
        Ok(serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text })))
    }

    /// Service-provided overall description, if the service offers one.
    async fn fetch_description(&self) -> Result<Option<String>, ToolError> {
        let r = self.get_json("/api/description").await?;
        if !is_success(&r) {
            return Ok(None);
        }
        Ok(Some(str_field(&r, "description")).filter(|d| !d.is_empty()))
    }

    /// Current agent catalog. Empty when the service reports failure.
    pub async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ToolError> {
        let r = self.get_json("/api/catalog").await?;
        if !is_success(&r) {
            return Ok(Vec::new());
        }
        Ok(r.get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(CatalogEntry::from_value).collect())
            .unwrap_or_default())
    }

    async fn route(&self, input: &Value, context: &ToolContext) -> Result<String, ToolError> {
        let mut query = arg_str(input, "query").trim().to_string();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("query must not be empty".to_string()));
        }

        // /api/query has no preferred-agent field; the hint rides inline.
        let preferred = arg_str(input, "preferred_agent").trim().to_string();
        if !preferred.is_empty() {
            query = format!("[preferred_agent={preferred}]\n{query}");
        }

        let mut req = json!({ "query": query });
        if let Some(force_reload) = arg_bool(input, "force_reload") {
            req["force_reload"] = Value::Bool(force_reload);
        }

        context.info("[agent_router] POST /api/query ...");
        let resp = self.post_json("/api/query", &req).await?;

        if !is_success(&resp) {
            let message = str_field(&resp, "error");
            return Err(ToolError::ExecutionFailed(if message.is_empty() {
                "agent router reported failure without an error message".to_string()
            } else {
                message
            }));
        }

        let text = ["friendly_response", "response", "raw_response"]
            .iter()
            .map(|k| str_field(&resp, k))
            .find(|s| !s.is_empty());

        Ok(text.unwrap_or_else(|| {
            let agent = str_field(&resp, "routed_agent");
            let confidence = resp
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            format!("routed to: {agent} (confidence {confidence:.2}), but no text output.")
        }))
    }
}

#[async_trait]
impl Tool for AgentRouterTool {
    fn name(&self) -> &str {
        "agent_router"
    }

    async fn description(&self) -> String {
        let base = match self.fetch_description().await {
            Ok(Some(d)) => d,
            Ok(None) => DEFAULT_DESCRIPTION.to_string(),
            Err(e) => {
                debug!(error = %e, "description fetch failed, using default");
                DEFAULT_DESCRIPTION.to_string()
            }
        };

        match self.fetch_catalog().await {
            Ok(entries) => format!("{base}{}", format_catalog(&entries)),
            Err(e) => {
                warn!(error = %e, "agent_router description catalog fetch failed");
                base
            }
        }
    }

    async fn input_schema(&self) -> Value {
        let names = match self.fetch_catalog().await {
            Ok(entries) => agent_names(&entries),
            Err(e) => {
                warn!(error = %e, "agent_router schema catalog fetch failed");
                Vec::new()
            }
        };

        let preferred = if names.is_empty() {
            json!({
                "type": "string",
                "description": "Optional preferred routing target (a hint to the router, not enforced)"
            })
        } else {
            json!({
                "type": "string",
                "description": format!(
                    "Optional preferred routing target (a hint to the router, not enforced). Candidates: {}",
                    names.join(" / ")
                ),
                "enum": names,
            })
        };

        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The user's question or request (required)"
                },
                "preferred_agent": preferred,
                "force_reload": {
                    "type": "boolean",
                    "description": "Force the router to reload its agent catalog (rarely needed)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let started = Instant::now();
        let result = match self.route(&input, context).await {
            Ok(text) => ToolResult::text(text),
            Err(ToolError::InvalidInput(msg)) => ToolResult::error(format!("invalid input: {msg}")),
            Err(e) => {
                error!(request_id = %context.rid(), error = %e, "agent_router call failed");
                ToolResult::error(format!("agent router call failed: {e}"))
            }
        };
        context.info(&format!(
            "[agent_router] done, cost={}ms",
            started.elapsed().as_millis()
        ));
        Ok(result)
    }
}

/// Render the catalog as the human-readable section appended to the
/// tool description. Empty catalog renders as nothing.
pub fn format_catalog(entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut out = format!("\n\nRoutable agents ({}):", entries.len());
    for e in entries {
        out.push_str(&format!("\n- name: {}", e.name));
        if !e.category.is_empty() {
            out.push_str(&format!(" (category: {})", e.category));
        }
        if !e.version.is_empty() {
            out.push_str(&format!("  version: {}", e.version));
        }
        if !e.model.is_empty() {
            out.push_str(&format!("  model: {}", e.model));
        }
        if !e.api_url.is_empty() {
            out.push_str(&format!("  API: {}", e.api_url));
        }
        if !e.skills.is_empty() {
            out.push_str(&format!("  skills: {}", e.skills.join(", ")));
        }
        if !e.description.is_empty() {
            out.push_str(&format!("\n  summary: {}", e.description.trim()));
        }
    }

    let names = agent_names(entries);
    if !names.is_empty() {
        out.push_str(&format!("\n\npreferred_agent options: {}", names.join(" / ")));
    }
    out
}

fn agent_names(entries: &[CatalogEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.name.clone())
        .filter(|n| !n.is_empty())
        .collect()
}

fn is_success(v: &Value) -> bool {
    v.get("success").and_then(Value::as_bool).unwrap_or(false)
}

/// String view of a field; numbers and booleans are stringified, anything
/// else (missing, null, objects) reads as empty.
fn str_field(v: &Value, key: &str) -> String {
    match v.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(n @ Value::Number(_)) => n.to_string(),
        Some(b @ Value::Bool(_)) => b.to_string(),
        _ => String::new(),
    }
}
