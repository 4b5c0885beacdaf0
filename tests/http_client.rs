//! REST client behavior against a wiremock server.

use std::time::{Duration, Instant};

use maicraft_link::config::HttpSettings;
use maicraft_link::http::{
    ErrorKind, LogQuery, LogStatsQuery, RequestOptions, ToolCallRequest, register_auth,
};
use maicraft_link::{ErrorCode, HttpClient};
use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, max_retries: u32, retry_delay: Duration) -> HttpClient {
    let settings = HttpSettings {
        base_url: format!("{}/api", server.uri()),
        max_retries,
        retry_delay,
        ..HttpSettings::default()
    };
    HttpClient::new(settings).expect("valid settings")
}

#[tokio::test]
async fn test_server_error_is_retried_until_budget_spent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "busy" })))
        .expect(4)
        .mount(&server)
        .await;

    let client = client(&server, 3, Duration::from_millis(50));
    let started = Instant::now();
    let err = client.get("/status").await.unwrap_err();

    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(err.error_code, ErrorCode::InternalError);
    assert_eq!(err.status_code, Some(503));
    assert_eq!(err.message, "busy");

    // Reported once, after the last attempt.
    assert_eq!(client.reporter().len(), 1);
    assert_eq!(client.reporter().by_kind(ErrorKind::Api).len(), 1);
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "ERROR",
            "error_code": "INVALID_PARAMETER",
            "message": "details is required",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 3, Duration::from_millis(50));
    let err = client.post("/tasks", json!({})).await.unwrap_err();

    assert_eq!(err.error_code, ErrorCode::InvalidParameter);
    assert_eq!(err.status_code, Some(400));
    assert!(!err.can_retry());
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/player"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/player"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "SUCCESS",
            "success": true,
            "message": "ok",
            "data": { "name": "Steve" },
            "timestamp": 1,
        })))
        .mount(&server)
        .await;

    let client = client(&server, 2, Duration::from_millis(10));
    let response = client.get("/player").await.expect("second attempt succeeds");

    assert!(response.success);
    assert_eq!(response.data["name"], "Steve");
    assert!(client.reporter().is_empty());
}

#[tokio::test]
async fn test_query_params_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/tasks/7"))
        .and(query_param("force", "true"))
        .and(body_json(json!({ "done": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 0, Duration::ZERO);
    let options = RequestOptions::new(Method::PUT)
        .param("force", "true")
        .param("skipped", serde_json::Value::Null)
        .body(json!({ "done": true }));
    let response = client.request("/tasks/7", options).await.expect("ok");

    // Non-envelope bodies are wrapped whole.
    assert_eq!(response.data["updated"], 1);
    assert_eq!(response.code, "SUCCESS");
}

#[tokio::test]
async fn test_auth_interceptor_sets_and_clears_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/secure"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 3, Duration::from_millis(10));
    let auth = register_auth(client.interceptors(), Some("secret".to_string()));

    let err = client.get("/secure").await.unwrap_err();
    assert_eq!(err.error_code, ErrorCode::AuthenticationError);
    assert_eq!(auth.token(), None);
}

#[tokio::test]
async fn test_log_wrappers_hit_log_routes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logs/level"))
        .and(body_json(json!({ "level": "DEBUG" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "SUCCESS",
            "data": { "previous_level": "INFO" },
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/logs/recent"))
        .and(query_param("limit", "20"))
        .and(query_param("module", "mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "logs": [], "total": 0 } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/logs/stats"))
        .and(query_param("levels", "ERROR,WARNING"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "total_logs": 3 } })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 0, Duration::ZERO);
    let logs = client.logs();

    let changed = logs.set_level("DEBUG").await.expect("set level");
    assert_eq!(changed.data["previous_level"], "INFO");

    let query = LogQuery {
        limit: Some(20),
        module: Some("mcp".into()),
        ..LogQuery::default()
    };
    let recent = logs.recent(&query).await.expect("recent");
    assert_eq!(recent.data["total"], 0);

    let stats = LogStatsQuery {
        levels: vec!["ERROR".into(), "WARNING".into()],
        ..LogStatsQuery::default()
    };
    assert_eq!(logs.stats(&stats).await.expect("stats").data["total_logs"], 3);
}

#[tokio::test]
async fn test_mcp_wrappers_decode_tool_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/mcp/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isSuccess": true,
            "message": "ok",
            "data": {
                "tools": [{ "name": "mine_block", "description": "Mine", "category": "world", "enabled": true }],
                "categories": ["world"],
                "total": 1,
            },
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/mcp/tools/mine_block/call"))
        .and(body_json(json!({ "parameters": { "name": "oak_log" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isSuccess": true,
            "data": { "call_id": "c-1", "tool_name": "mine_block", "status": "success", "timestamp": 1 },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 0, Duration::ZERO);

    let tools = client.mcp().tools().await.expect("tools");
    assert_eq!(tools.total, 1);
    assert_eq!(tools.tools[0].name, "mine_block");

    let mut request = ToolCallRequest::default();
    request.parameters.insert("name".into(), json!("oak_log"));
    let call = client.mcp().call_tool("mine_block", &request).await.expect("call");
    assert_eq!(call.call_id, "c-1");
    assert_eq!(call.status, "success");
}

#[tokio::test]
async fn test_mcp_rejected_envelope_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/mcp/tools/missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isSuccess": false,
            "message": "tool not found",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, 0, Duration::ZERO);
    let err = client.mcp().tool("missing").await.unwrap_err();
    assert_eq!(err.error_code, ErrorCode::OperationFailed);
    assert_eq!(err.message, "tool not found");
}
