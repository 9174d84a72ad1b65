//! Memory tool backed by a Cognee knowledge-graph service.
//!
//! Each invocation authenticates once per tool instance, resolves the
//! target dataset and performs one of `add`, `search` or `visualize`.
//! Cognify after `add` is a soft step: its failure is reported in the
//! result but never fails the add.

mod auth;
mod request;

pub use self::auth::Credential;
pub use self::request::{DatasetSelector, MemoryOp, MemoryRequest};

use std::time::Instant;

use agentlink_core::MemoryConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::artifact::safe_file_name;
use crate::tool::{Tool, ToolContext, ToolError, ToolResult};

const DESCRIPTION: &str = "Must be called first for any question about the user's preferences, \
personal details, habits, preferred names, schedule, reminders, default settings or favourite tools. \
Talks to the Cognee memory service: auth, then add / cognify / search / visualize (results are \
saved as files; cognify runs in the background by default and fails softly).";

/// Cognee memory adapter.
pub struct CogneeMemoryTool {
    config: MemoryConfig,
    http: reqwest::Client,
    /// Foreground cognify client with the longer read window.
    cognify_http: reqwest::Client,
    credential: OnceCell<Credential>,
}

impl CogneeMemoryTool {
    pub fn new(config: MemoryConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .timeout(config.call_timeout())
            .build()?;
        let cognify_http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.cognify_read_timeout())
            .timeout(config.cognify_call_timeout())
            .build()?;
        Ok(Self {
            config,
            http,
            cognify_http,
            credential: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    // ── Auth ──────────────────────────────────────────────────

    /// Establish the session credential on first use and reuse it after.
    ///
    /// Concurrent first calls wait on a single login. A failed attempt
    /// leaves nothing cached, so a later invocation tries again.
    pub async fn ensure_auth(&self, context: &ToolContext) -> Result<&Credential, ToolError> {
        self.credential
            .get_or_try_init(|| self.authenticate(context))
            .await
    }

    async fn authenticate(&self, context: &ToolContext) -> Result<Credential, ToolError> {
        if let Some(cred) = self.try_login(context).await {
            return Ok(cred);
        }
        self.try_register(context).await;
        self.try_login(context)
            .await
            .ok_or_else(|| ToolError::Auth("login after register still failed".to_string()))
    }

    async fn try_login(&self, context: &ToolContext) -> Option<Credential> {
        let form = [
            ("username", self.config.email.as_str()),
            ("password", self.config.password.as_str()),
            ("grant_type", "password"),
        ];
        let resp = match self
            .http
            .post(self.url("/api/v1/auth/login"))
            .form(&form)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(request_id = %context.rid(), error = %e, "login request failed");
                return None;
            }
        };

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(request_id = %context.rid(), error = %e, "login response unreadable");
                return None;
            }
        };
        let cred = Credential::from_login(status.is_success(), &headers, &body);
        if cred.is_none() {
            warn!(request_id = %context.rid(), status = status.as_u16(), body = %body, "login failed");
        }
        cred
    }

    /// Register the configured account. The outcome is only logged; the
    /// follow-up login decides whether auth succeeded.
    async fn try_register(&self, context: &ToolContext) {
        let body = json!({
            "email": self.config.email,
            "password": self.config.password,
            "is_verified": true,
        });
        match self
            .http
            .post(self.url("/api/v1/auth/register"))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => {
                let status = resp.status().as_u16();
                match resp.text().await {
                    Ok(text) => info!(request_id = %context.rid(), status, body = %text, "register result"),
                    Err(e) => warn!(request_id = %context.rid(), status, error = %e, "register response unreadable"),
                }
            }
            Err(e) => {
                warn!(request_id = %context.rid(), error = %e, "register request failed");
            }
        }
    }

    fn authed(&self, rb: RequestBuilder, cred: &Credential) -> RequestBuilder {
        cred.apply(rb, self.config.auth_preference)
    }

    /// Send an authenticated request, treating non-2xx as an error.
    async fn send_checked(&self, rb: RequestBuilder, url: &str) -> Result<String, ToolError> {
        let resp = rb.send().await.map_err(|e| log_timeout(e, url))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| log_timeout(e, url))?;
        if !status.is_success() {
            return Err(ToolError::Remote {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(body)
    }

    async fn authed_post_json(
        &self,
        http: &reqwest::Client,
        cred: &Credential,
        path: &str,
        body: &Value,
    ) -> Result<String, ToolError> {
        let url = self.url(path);
        let rb = self.authed(http.post(&url).json(body), cred);
        self.send_checked(rb, &url).await
    }

    // ── Datasets ──────────────────────────────────────────────

    /// Default dataset name for this context: `<prefix>_<session>` or `<prefix>`.
    pub fn default_dataset_name(&self, context: &ToolContext) -> String {
        match context.session() {
            Some(sid) => format!("{}_{}", self.config.dataset_prefix, safe_file_name(sid)),
            None => self.config.dataset_prefix.clone(),
        }
    }

    async fn resolve_dataset(
        &self,
        selector: &DatasetSelector,
        cred: &Credential,
        context: &ToolContext,
    ) -> Result<String, ToolError> {
        let name = match selector {
            DatasetSelector::Id(id) => return Ok(id.clone()),
            DatasetSelector::Name(name) => name.clone(),
            DatasetSelector::Default => self.default_dataset_name(context),
        };
        self.ensure_dataset(&name, cred).await
    }

    async fn ensure_dataset(&self, name: &str, cred: &Credential) -> Result<String, ToolError> {
        let resp = self
            .authed_post_json(&self.http, cred, "/api/v1/datasets", &json!({ "name": name }))
            .await?;
        let parsed: Value = serde_json::from_str(&resp).map_err(|e| {
            ToolError::ExecutionFailed(format!("create dataset returned invalid JSON ({e}): {resp}"))
        })?;
        match parsed.get("id") {
            Some(Value::String(id)) if !id.is_empty() && id != "null" => Ok(id.clone()),
            Some(n @ Value::Number(_)) => Ok(n.to_string()),
            _ => Err(ToolError::ExecutionFailed(format!(
                "create dataset but no id: {resp}"
            ))),
        }
    }

    // ── Operations ────────────────────────────────────────────

    async fn add_text(
        &self,
        cred: &Credential,
        dataset_id: &str,
        text: &str,
    ) -> Result<String, ToolError> {
        let file_name = format!("cognee_mem_{}.txt", uuid::Uuid::new_v4().simple());
        let part = Part::bytes(text.as_bytes().to_vec())
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("datasetId", dataset_id.to_string())
            .part("data", part);

        let url = self.url("/api/v1/add");
        let rb = self.authed(self.http.post(&url).multipart(form), cred);
        self.send_checked(rb, &url).await
    }

    /// Trigger knowledge-graph construction for the given datasets.
    ///
    /// In the foreground the read window is the configured cognify wait
    /// (at least 15s) and the whole call gets 5s more.
    async fn cognify(
        &self,
        cred: &Credential,
        dataset_ids: &[String],
        run_in_background: bool,
    ) -> Result<Value, ToolError> {
        let body = json!({
            "datasetIds": dataset_ids,
            "runInBackground": run_in_background,
        });
        let (http, deadline) = if run_in_background {
            (&self.http, self.config.call_timeout())
        } else {
            (&self.cognify_http, self.config.cognify_call_timeout())
        };
        let resp = self
            .authed_post_json(http, cred, "/api/v1/cognify", &body)
            .await
            .map_err(|e| match e {
                ToolError::Http(ref inner) if inner.is_timeout() => ToolError::Timeout(deadline),
                other => other,
            })?;
        serde_json::from_str(&resp).map_err(|e| {
            ToolError::ExecutionFailed(format!("cognify returned invalid JSON ({e}): {resp}"))
        })
    }

    async fn run_add(
        &self,
        cred: &Credential,
        dataset: &DatasetSelector,
        text: &str,
        do_cognify: bool,
        run_in_background: bool,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let dataset_id = self.resolve_dataset(dataset, cred, context).await?;
        context.info(&format!("[cognee] dataset={dataset_id}"));

        let add_resp = self.add_text(cred, &dataset_id, text).await?;
        context.info("[cognee] add done");

        let mut out = json!({
            "op": "add",
            "status": "ok",
            "datasetId": dataset_id,
            "add_response": parse_json_safe(&add_resp),
        });

        if do_cognify {
            context.info("[cognee] cognify running ...");
            match self
                .cognify(cred, &[dataset_id.clone()], run_in_background)
                .await
            {
                Ok(resp) => {
                    out["cognify_response"] = resp;
                    context.info("[cognee] cognify done");
                }
                Err(e) => {
                    warn!(
                        request_id = %context.rid(),
                        error = %e,
                        "cognify failed/timeout but add succeeded"
                    );
                    out["cognify_error"] = Value::String(e.to_string());
                    context.info("[cognee] cognify failed (soft)");
                }
            }
        }

        context
            .persist(
                &format!("cognee_add_{dataset_id}"),
                "cognee add",
                format!("Cognee Add Result\n\nDataset: {dataset_id}\n\n{text}"),
            )
            .await;

        Ok(out)
    }

    async fn run_search(
        &self,
        cred: &Credential,
        dataset: &DatasetSelector,
        query: &str,
        search_type: &str,
        top_k: i64,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let dataset_id = self.resolve_dataset(dataset, cred, context).await?;
        context.info(&format!("[cognee] dataset={dataset_id}"));

        let body = json!({
            "searchType": search_type,
            "datasetIds": [dataset_id],
            "query": query,
            "topK": top_k,
        });
        let resp = self
            .authed_post_json(&self.http, cred, "/api/v1/search", &body)
            .await?;
        let parsed = parse_json_safe(&resp);

        context
            .persist(
                &format!("cognee_search_{dataset_id}"),
                "cognee search",
                format!(
                    "Cognee Search Result\n\nDataset: {dataset_id}\nType: {search_type}\nTopK: {top_k}\nQuery: {query}\n\n{}",
                    pretty(&parsed)
                ),
            )
            .await;
        context.info("[cognee] search done");

        Ok(json!({
            "op": "search",
            "status": "ok",
            "datasetId": dataset_id,
            "query": query,
            "search_type": search_type,
            "top_k": top_k,
            "data": parsed,
        }))
    }

    /// Fetch the graph visualization. The status is relayed rather than checked.
    async fn run_visualize(
        &self,
        cred: &Credential,
        dataset_id: &str,
        context: &ToolContext,
    ) -> Result<Value, ToolError> {
        let rb = self.authed(
            self.http
                .get(self.url("/api/v1/visualize"))
                .query(&[("dataset_id", dataset_id)]),
            cred,
        );
        let resp = rb.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let parsed = parse_json_safe(&body);
        context.info(&format!(
            "[cognee] visualize status={status} dataset={dataset_id}"
        ));

        context
            .persist(
                &format!("cognee_visualize_{dataset_id}"),
                "cognee visualize",
                format!(
                    "Cognee Visualize\n\nDataset: {dataset_id}\nStatus: {status}\n\n{}",
                    pretty(&parsed)
                ),
            )
            .await;

        Ok(json!({
            "op": "visualize",
            "status": "ok",
            "datasetId": dataset_id,
            "http_status": status,
            "data": parsed,
        }))
    }

    async fn run(&self, req: MemoryRequest, context: &ToolContext) -> Result<Value, ToolError> {
        context.info(&format!("[cognee] start ({})", req.op.mode()));
        let cred = self.ensure_auth(context).await?;
        context.info("[cognee] auth ok");

        match &req.op {
            MemoryOp::Add {
                text,
                do_cognify,
                run_in_background,
            } => {
                self.run_add(
                    cred,
                    &req.dataset,
                    text,
                    *do_cognify,
                    *run_in_background,
                    context,
                )
                .await
            }
            MemoryOp::Search {
                query,
                search_type,
                top_k,
            } => {
                self.run_search(cred, &req.dataset, query, search_type, *top_k, context)
                    .await
            }
            MemoryOp::Visualize { dataset_id } => {
                self.run_visualize(cred, dataset_id, context).await
            }
        }
    }
}

#[async_trait]
impl Tool for CogneeMemoryTool {
    fn name(&self) -> &str {
        "cognee_memory"
    }

    async fn description(&self) -> String {
        DESCRIPTION.to_string()
    }

    async fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "mode": {
                    "type": "string",
                    "enum": ["add", "search", "visualize"],
                    "description": "add (store a memory), search (retrieve), visualize (knowledge graph HTML)"
                },
                "text": {
                    "type": "string",
                    "description": "mode=add: the text to store"
                },
                "dataset_name": {
                    "type": "string",
                    "description": format!(
                        "Defaults to {0} or {0}_<sessionId>",
                        self.config.dataset_prefix
                    )
                },
                "dataset_id": {
                    "type": "string",
                    "description": "Existing dataset id (takes precedence when given)"
                },
                "do_cognify": {
                    "type": "boolean",
                    "description": "Run cognify after add (default false)"
                },
                "run_in_background": {
                    "type": "boolean",
                    "description": "With do_cognify=true, run it in the background (default true)"
                },
                "query": {
                    "type": "string",
                    "description": "mode=search: the search text"
                },
                "search_type": {
                    "type": "string",
                    "description": "GRAPH_COMPLETION / SUMMARIES / CHUNKS / ... (default GRAPH_COMPLETION)"
                },
                "top_k": {
                    "type": "integer",
                    "description": "TopK (default 5)"
                },
                "visualize_dataset_id": {
                    "type": "string",
                    "description": "mode=visualize: required, dataset id (UUID)"
                }
            },
            "required": ["mode"]
        })
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let started = Instant::now();
        let result = match MemoryRequest::parse(&input) {
            Err(ToolError::InvalidInput(msg)) => ToolResult::error(msg),
            Err(e) => ToolResult::error(e.to_string()),
            Ok(req) => match self.run(req, context).await {
                Ok(out) => ToolResult::text(out.to_string()),
                Err(e) => {
                    error!(request_id = %context.rid(), error = %e, "cognee_memory failed");
                    ToolResult::error(format!("exception: {e}"))
                }
            },
        };
        info!(
            request_id = %context.rid(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cognee_memory finished"
        );
        context.info("[cognee] done");
        Ok(result)
    }
}

fn log_timeout(e: reqwest::Error, url: &str) -> ToolError {
    if e.is_timeout() {
        warn!(url, "request timed out");
    }
    ToolError::Http(e)
}

fn parse_json_safe(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

#[cfg(test)]
mod tests;
