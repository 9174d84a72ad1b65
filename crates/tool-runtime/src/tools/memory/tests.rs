//! Unit tests for the Cognee memory tool.

use std::sync::Arc;
use std::time::Duration;

use agentlink_core::{AuthPreference, MemoryConfig};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

use super::*;
use crate::artifact::FileArtifactStore;
use crate::progress::CollectingSink;

fn tool_with(server: &ServerGuard, f: impl FnOnce(&mut MemoryConfig)) -> CogneeMemoryTool {
    let mut config = MemoryConfig {
        base_url: server.url(),
        ..MemoryConfig::default()
    };
    f(&mut config);
    CogneeMemoryTool::new(config).unwrap()
}

fn tool_for(server: &ServerGuard) -> CogneeMemoryTool {
    tool_with(server, |_| {})
}

fn ctx() -> ToolContext {
    ToolContext::new("req-test")
}

async fn mock_token_login(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/api/v1/auth/login")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".into(), "admin@example.com".into()),
            Matcher::UrlEncoded("grant_type".into(), "password".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "tok-1", "token_type": "bearer"}"#)
        .expect(1)
        .create_async()
        .await
}

fn ok_json(result: &ToolResult) -> Value {
    assert!(!result.is_error, "expected success, got: {}", result.content);
    serde_json::from_str(&result.content).unwrap()
}

fn error_of(result: &ToolResult) -> String {
    assert!(result.is_error, "expected error, got: {}", result.content);
    let parsed: Value = serde_json::from_str(&result.content).unwrap();
    parsed["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_invalid_input_makes_no_requests() {
    let mut server = Server::new_async().await;
    let posts = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let gets = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let tool = tool_for(&server);
    let cases = [
        (json!({}), "mode is required"),
        (json!({"mode": "add"}), "text is required for add"),
        (json!({"mode": "search"}), "query is required for search"),
        (json!({"mode": "visualize"}), "visualize requires visualize_dataset_id"),
        (json!({"mode": "delete"}), "unsupported mode: delete"),
    ];
    for (input, expected) in cases {
        let result = tool.execute(input, &ctx()).await.unwrap();
        assert_eq!(error_of(&result), expected);
    }

    posts.assert_async().await;
    gets.assert_async().await;
}

#[tokio::test]
async fn test_register_fallback_then_credential_reused() {
    let mut server = Server::new_async().await;
    let login_fail = server
        .mock("POST", "/api/v1/auth/login")
        .with_status(400)
        .with_body(r#"{"detail": "LOGIN_BAD_CREDENTIALS"}"#)
        .expect(1)
        .create_async()
        .await;
    let register = server
        .mock("POST", "/api/v1/auth/register")
        .match_body(Matcher::PartialJson(json!({
            "email": "admin@example.com",
            "password": "admin123",
            "is_verified": true
        })))
        .with_status(201)
        .with_body(r#"{"id": "user-1"}"#)
        .expect(1)
        .create_async()
        .await;
    let login_ok = mock_token_login(&mut server).await;
    let visualize = server
        .mock("GET", "/api/v1/visualize")
        .match_query(Matcher::UrlEncoded("dataset_id".into(), "ds-1".into()))
        .match_header("authorization", "Bearer tok-1")
        .with_body("<html>graph</html>")
        .expect(2)
        .create_async()
        .await;

    let tool = tool_for(&server);
    let input = json!({"mode": "visualize", "visualize_dataset_id": "ds-1"});

    let first = ok_json(&tool.execute(input.clone(), &ctx()).await.unwrap());
    assert_eq!(first["http_status"], 200);
    assert_eq!(first["data"], "<html>graph</html>");

    ok_json(&tool.execute(input, &ctx()).await.unwrap());

    login_fail.assert_async().await;
    register.assert_async().await;
    login_ok.assert_async().await;
    visualize.assert_async().await;
}

#[tokio::test]
async fn test_auth_failure_terminates_invocation() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/api/v1/auth/login")
        .with_status(400)
        .expect(2)
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/auth/register")
        .with_status(400)
        .with_body(r#"{"detail": "REGISTER_USER_ALREADY_EXISTS"}"#)
        .create_async()
        .await;
    let datasets = server
        .mock("POST", "/api/v1/datasets")
        .expect(0)
        .create_async()
        .await;

    let result = tool_for(&server)
        .execute(json!({"mode": "add", "text": "hello"}), &ctx())
        .await
        .unwrap();
    let msg = error_of(&result);
    assert!(msg.starts_with("exception: Auth failed"), "{msg}");

    login.assert_async().await;
    datasets.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_first_use_logs_in_once() {
    let mut server = Server::new_async().await;
    let login = mock_token_login(&mut server).await;

    let tool = tool_for(&server);
    let (c1, c2) = (ctx(), ctx());
    let (a, b) = tokio::join!(tool.ensure_auth(&c1), tool.ensure_auth(&c2));
    assert_eq!(a.unwrap().bearer.as_deref(), Some("tok-1"));
    assert_eq!(b.unwrap().bearer.as_deref(), Some("tok-1"));

    login.assert_async().await;
}

#[tokio::test]
async fn test_cookie_login_sends_cookie_header() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/auth/login")
        .with_status(204)
        .with_header("set-cookie", "auth_token=abc; Path=/; HttpOnly")
        .with_header("set-cookie", "csrf=xyz; Path=/")
        .create_async()
        .await;
    let search = server
        .mock("POST", "/api/v1/search")
        .match_header("cookie", "auth_token=abc; csrf=xyz")
        .match_header("authorization", Matcher::Missing)
        .with_body("[]")
        .create_async()
        .await;

    let result = tool_for(&server)
        .execute(json!({"mode": "search", "query": "q", "dataset_id": "ds-1"}), &ctx())
        .await
        .unwrap();
    ok_json(&result);
    search.assert_async().await;
}

#[tokio::test]
async fn test_bearer_preference_when_both_offered() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/auth/login")
        .with_header("set-cookie", "auth_token=abc")
        .with_body(r#"{"access_token": "tok-2"}"#)
        .create_async()
        .await;
    let search = server
        .mock("POST", "/api/v1/search")
        .match_header("authorization", "Bearer tok-2")
        .match_header("cookie", Matcher::Missing)
        .with_body("[]")
        .create_async()
        .await;

    let tool = tool_with(&server, |c| c.auth_preference = AuthPreference::Bearer);
    let result = tool
        .execute(json!({"mode": "search", "query": "q", "dataset_id": "ds-1"}), &ctx())
        .await
        .unwrap();
    ok_json(&result);
    search.assert_async().await;
}

#[tokio::test]
async fn test_explicit_dataset_id_skips_creation() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    let datasets = server
        .mock("POST", "/api/v1/datasets")
        .expect(0)
        .create_async()
        .await;
    let search = server
        .mock("POST", "/api/v1/search")
        .match_body(Matcher::Json(json!({
            "searchType": "SUMMARIES",
            "datasetIds": ["ds-7"],
            "query": "coffee?",
            "topK": 3
        })))
        .with_body(r#"[{"text": "prefers espresso"}]"#)
        .create_async()
        .await;

    let result = tool_for(&server)
        .execute(
            json!({
                "mode": "search",
                "query": "coffee?",
                "dataset_id": "ds-7",
                "dataset_name": "ignored",
                "search_type": "SUMMARIES",
                "top_k": 3
            }),
            &ctx(),
        )
        .await
        .unwrap();

    let out = ok_json(&result);
    assert_eq!(out["op"], "search");
    assert_eq!(out["status"], "ok");
    assert_eq!(out["datasetId"], "ds-7");
    assert_eq!(out["search_type"], "SUMMARIES");
    assert_eq!(out["top_k"], 3);
    assert_eq!(out["data"][0]["text"], "prefers espresso");

    datasets.assert_async().await;
    search.assert_async().await;
}

#[tokio::test]
async fn test_default_dataset_is_session_scoped() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    let datasets = server
        .mock("POST", "/api/v1/datasets")
        .match_body(Matcher::Json(json!({"name": "agent_profile_sess_42"})))
        .with_body(r#"{"id": "ds-s"}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/search")
        .match_body(Matcher::PartialJson(json!({"datasetIds": ["ds-s"]})))
        .with_body("[]")
        .create_async()
        .await;

    let context = ctx().with_session("sess: 42");
    let result = tool_for(&server)
        .execute(json!({"mode": "search", "query": "q"}), &context)
        .await
        .unwrap();
    assert_eq!(ok_json(&result)["datasetId"], "ds-s");
    datasets.assert_async().await;
}

#[tokio::test]
async fn test_default_dataset_without_session_uses_prefix() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    let datasets = server
        .mock("POST", "/api/v1/datasets")
        .match_body(Matcher::Json(json!({"name": "agent_profile"})))
        .with_body(r#"{"id": "ds-p"}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/search")
        .with_body("[]")
        .create_async()
        .await;

    tool_for(&server)
        .execute(json!({"mode": "search", "query": "q"}), &ctx())
        .await
        .unwrap();
    datasets.assert_async().await;
}

#[tokio::test]
async fn test_dataset_without_id_is_an_error() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/datasets")
        .with_body(r#"{"id": "null"}"#)
        .create_async()
        .await;

    let result = tool_for(&server)
        .execute(json!({"mode": "search", "query": "q", "dataset_name": "notes"}), &ctx())
        .await
        .unwrap();
    assert!(error_of(&result).contains("create dataset but no id"));
}

#[tokio::test]
async fn test_add_uploads_text_as_multipart() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/datasets")
        .match_body(Matcher::Json(json!({"name": "profile"})))
        .with_body(r#"{"id": "ds-9"}"#)
        .create_async()
        .await;
    let add = server
        .mock("POST", "/api/v1/add")
        .match_header("authorization", "Bearer tok-1")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="datasetId""#.into()),
            Matcher::Regex("ds-9".into()),
            Matcher::Regex(r#"name="data"; filename="cognee_mem_[0-9a-f]+\.txt""#.into()),
            Matcher::Regex("call me Sam".into()),
        ]))
        .with_body(r#"{"status": "PipelineRunCompleted"}"#)
        .create_async()
        .await;
    let cognify = server
        .mock("POST", "/api/v1/cognify")
        .expect(0)
        .create_async()
        .await;

    let result = tool_for(&server)
        .execute(
            json!({"mode": "add", "text": "call me Sam", "dataset_name": "profile"}),
            &ctx(),
        )
        .await
        .unwrap();

    let out = ok_json(&result);
    assert_eq!(out["op"], "add");
    assert_eq!(out["status"], "ok");
    assert_eq!(out["datasetId"], "ds-9");
    assert_eq!(out["add_response"]["status"], "PipelineRunCompleted");
    assert!(out.get("cognify_response").is_none());
    assert!(out.get("cognify_error").is_none());

    add.assert_async().await;
    cognify.assert_async().await;
}

#[tokio::test]
async fn test_foreground_cognify_failure_is_soft() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/add")
        .with_body("{}")
        .create_async()
        .await;
    let cognify = server
        .mock("POST", "/api/v1/cognify")
        .match_body(Matcher::Json(json!({
            "datasetIds": ["ds-1"],
            "runInBackground": false
        })))
        .with_status(500)
        .with_body("pipeline crashed")
        .create_async()
        .await;

    let result = tool_for(&server)
        .execute(
            json!({
                "mode": "add",
                "text": "t",
                "dataset_id": "ds-1",
                "do_cognify": true,
                "run_in_background": false
            }),
            &ctx(),
        )
        .await
        .unwrap();

    let out = ok_json(&result);
    assert_eq!(out["status"], "ok");
    let cognify_error = out["cognify_error"].as_str().unwrap();
    assert!(cognify_error.contains("500"));
    assert!(cognify_error.contains("pipeline crashed"));
    cognify.assert_async().await;
}

/// Writes `head`, then stalls for `stall` before finishing with `tail`.
fn stalled_body(
    head: &'static str,
    stall: Duration,
    tail: &'static str,
) -> impl Fn(&mut dyn std::io::Write) -> std::io::Result<()> + Send + Sync + 'static {
    move |w| {
        w.write_all(head.as_bytes())?;
        w.flush()?;
        std::thread::sleep(stall);
        w.write_all(tail.as_bytes())
    }
}

#[tokio::test]
async fn test_foreground_cognify_outlasts_read_timeout() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/add")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/cognify")
        .match_body(Matcher::PartialJson(json!({"runInBackground": false})))
        .with_chunked_body(stalled_body("", Duration::from_secs(3), r#"{"status": "done"}"#))
        .create_async()
        .await;

    let tool = tool_with(&server, |c| {
        c.read_timeout_secs = 1;
        c.cognify_wait_secs = 15;
    });
    let result = tool
        .execute(
            json!({
                "mode": "add",
                "text": "t",
                "dataset_id": "ds-1",
                "do_cognify": true,
                "run_in_background": false
            }),
            &ctx(),
        )
        .await
        .unwrap();

    let out = ok_json(&result);
    assert_eq!(out["cognify_response"]["status"], "done");
    assert!(out.get("cognify_error").is_none());
}

#[tokio::test]
async fn test_stalled_cognify_reports_timeout() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/add")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/cognify")
        .with_chunked_body(stalled_body("{", Duration::from_secs(3), "}"))
        .create_async()
        .await;

    let tool = tool_with(&server, |c| c.read_timeout_secs = 1);
    let result = tool
        .execute(
            json!({"mode": "add", "text": "t", "dataset_id": "ds-1", "do_cognify": true}),
            &ctx(),
        )
        .await
        .unwrap();

    let out = ok_json(&result);
    assert_eq!(out["status"], "ok");
    let cognify_error = out["cognify_error"].as_str().unwrap();
    assert!(cognify_error.starts_with("Timeout after"), "{cognify_error}");
}

#[tokio::test]
async fn test_stalled_search_body_is_an_error() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/search")
        .with_chunked_body(stalled_body(r#"{"results": ["#, Duration::from_secs(3), "]}"))
        .create_async()
        .await;

    let tool = tool_with(&server, |c| c.read_timeout_secs = 1);
    let result = tool
        .execute(
            json!({"mode": "search", "query": "q", "dataset_id": "ds-1"}),
            &ctx(),
        )
        .await
        .unwrap();

    let msg = error_of(&result);
    assert!(msg.starts_with("exception: HTTP request failed"), "{msg}");
}

#[tokio::test]
async fn test_background_cognify_response_included() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/add")
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/cognify")
        .match_body(Matcher::PartialJson(json!({"runInBackground": true})))
        .with_body(r#"{"pipeline_run_id": "run-1"}"#)
        .create_async()
        .await;

    let result = tool_for(&server)
        .execute(
            json!({"mode": "add", "text": "t", "dataset_id": "ds-1", "do_cognify": true}),
            &ctx(),
        )
        .await
        .unwrap();
    let out = ok_json(&result);
    assert_eq!(out["cognify_response"]["pipeline_run_id"], "run-1");
}

#[tokio::test]
async fn test_add_http_error_is_reported() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/add")
        .with_status(409)
        .with_body("duplicate")
        .create_async()
        .await;

    let result = tool_for(&server)
        .execute(json!({"mode": "add", "text": "t", "dataset_id": "ds-1"}), &ctx())
        .await
        .unwrap();
    let msg = error_of(&result);
    assert!(msg.contains("409"));
    assert!(msg.contains("/api/v1/add"));
}

#[tokio::test]
async fn test_visualize_relays_status_and_persists() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("GET", "/api/v1/visualize")
        .match_query(Matcher::UrlEncoded("dataset_id".into(), "ds-x".into()))
        .with_status(404)
        .with_body(r#"{"detail": "not found"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let context = ctx().with_artifacts(Arc::new(FileArtifactStore::new(dir.path())));
    let result = tool_for(&server)
        .execute(json!({"mode": "visualize", "visualize_dataset_id": "ds-x"}), &context)
        .await
        .unwrap();

    let out = ok_json(&result);
    assert_eq!(out["status"], "ok");
    assert_eq!(out["http_status"], 404);
    assert_eq!(out["data"]["detail"], "not found");

    let saved = std::fs::read_to_string(dir.path().join("req-test").join("cognee_visualize_ds-x.md"))
        .unwrap();
    assert!(saved.starts_with("Cognee Visualize\n\nDataset: ds-x\nStatus: 404"));
}

#[tokio::test]
async fn test_search_transcript_and_progress() {
    let mut server = Server::new_async().await;
    mock_token_login(&mut server).await;
    server
        .mock("POST", "/api/v1/search")
        .with_body("plain text answer")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CollectingSink::default());
    let context = ctx()
        .with_artifacts(Arc::new(FileArtifactStore::new(dir.path())))
        .with_progress(sink.clone());

    let result = tool_for(&server)
        .execute(json!({"mode": "search", "query": "tea?", "dataset_id": "ds-1"}), &context)
        .await
        .unwrap();
    assert_eq!(ok_json(&result)["data"], "plain text answer");

    let saved = std::fs::read_to_string(dir.path().join("req-test").join("cognee_search_ds-1.md"))
        .unwrap();
    assert!(saved.contains("Type: GRAPH_COMPLETION\nTopK: 5\nQuery: tea?"));
    assert!(saved.contains("\"plain text answer\""));

    let lines = sink.lines();
    assert_eq!(lines.first().map(String::as_str), Some("[cognee] start (search)"));
    assert!(lines.contains(&"[cognee] auth ok".to_string()));
    assert!(lines.contains(&"[cognee] dataset=ds-1".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("file saved: ")));
    assert_eq!(lines.last().map(String::as_str), Some("[cognee] done"));
}

#[tokio::test]
async fn test_definition_schema() {
    let server = Server::new_async().await;
    let def = tool_for(&server).definition().await;
    assert_eq!(def.name, "cognee_memory");
    assert_eq!(def.input_schema["required"], json!(["mode"]));
    assert_eq!(
        def.input_schema["properties"]["mode"]["enum"],
        json!(["add", "search", "visualize"])
    );
    assert_eq!(def.input_schema["properties"]["top_k"]["type"], "integer");
}
