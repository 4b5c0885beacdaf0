//! REST proxy that starts and stops the agent.
//!
//! # Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `POST` | `/api/agent/start` | `{success, message, status}` |
//! | `POST` | `/api/agent/stop` | `{success, message}` |
//! | `GET` | `/api/agent/status` | `{status, pid, uptime}` |
//! | `POST` | `/api/agent/cleanup` | `{success, message, cleanupCount}` |
//! | `GET` | `/api/conda/envs` | `{success, environments: [{name, path}]}` |
//! | `GET` | `/api/system/envs` | `{success, environments: {conda, python, poetry, pipenv, uv}}` |
//! | `GET` | `/health` | `{status, timestamp, agent: {status, pid}}` |
//!
//! Failures answer `{success: false, message}` with 400 for rejected
//! requests and 500 for failures.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::error::{Error, Result};

use super::launcher::{StartRequest, detect_system_envs, list_conda_envs};
use super::process::{AgentStatus, AgentSupervisor};

/// Default listening port.
pub const DEFAULT_PROXY_PORT: u16 = 25106;

// ============================================================================
// Router
// ============================================================================

/// Builds the proxy router.
pub fn router(supervisor: Arc<AgentSupervisor>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/agent/start", post(start_agent))
        .route("/api/agent/stop", post(stop_agent))
        .route("/api/agent/status", get(agent_status))
        .route("/api/agent/cleanup", post(cleanup_agent))
        .route("/api/conda/envs", get(conda_envs))
        .route("/api/system/envs", get(system_envs))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(supervisor)
}

/// Serves the proxy until Ctrl+C or SIGTERM, then kills the agent.
///
/// # Errors
///
/// Returns an IO error if the listener cannot bind or the server fails.
pub async fn serve(addr: SocketAddr, supervisor: Arc<AgentSupervisor>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Agent proxy listening");

    axum::serve(listener, router(Arc::clone(&supervisor)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Agent proxy shutting down");
    supervisor.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let message = message.into();
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn ok(body: Value) -> Response {
    Json(body).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/agent/start
async fn start_agent(
    State(supervisor): State<Arc<AgentSupervisor>>,
    Json(request): Json<StartRequest>,
) -> Response {
    match supervisor.start(&request).await {
        Ok(snapshot) => ok(json!({
            "success": true,
            "message": "Agent started",
            "status": snapshot.status,
        })),
        Err(e @ (Error::InvalidArgument { .. } | Error::Agent { .. })) => {
            failure(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!("Agent start failed: {e}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Start failed: {e}"))
        }
    }
}

/// POST /api/agent/stop
async fn stop_agent(State(supervisor): State<Arc<AgentSupervisor>>) -> Response {
    match supervisor.stop().await {
        Ok(()) => ok(json!({ "success": true, "message": "Agent stopped" })),
        // A failed kill leaves the agent running.
        Err(e) if supervisor.status().status == AgentStatus::Running => {
            failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Stop failed: {e}"))
        }
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// GET /api/agent/status
async fn agent_status(State(supervisor): State<Arc<AgentSupervisor>>) -> impl IntoResponse {
    Json(supervisor.status())
}

/// POST /api/agent/cleanup
async fn cleanup_agent(State(supervisor): State<Arc<AgentSupervisor>>) -> Response {
    let count = supervisor.cleanup().await;
    let message = if count > 0 {
        format!("Cleanup finished, {count} process(es) killed")
    } else {
        "Cleanup finished, nothing to clean".to_string()
    };
    ok(json!({ "success": true, "message": message, "cleanupCount": count }))
}

/// GET /api/conda/envs
async fn conda_envs() -> Response {
    match list_conda_envs().await {
        Ok(envs) => ok(json!({ "success": true, "environments": envs })),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /api/system/envs
async fn system_envs() -> Response {
    let envs = detect_system_envs().await;
    ok(json!({ "success": true, "environments": envs }))
}

/// GET /health
async fn health_check(State(supervisor): State<Arc<AgentSupervisor>>) -> Response {
    let snapshot = supervisor.status();
    ok(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "agent": { "status": snapshot.status, "pid": snapshot.pid },
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn app() -> Router {
        let supervisor = AgentSupervisor::new()
            .with_grace(Duration::from_millis(200), Duration::from_secs(2));
        router(Arc::new(supervisor))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["agent"]["status"], "stopped");
        assert!(body["agent"]["pid"].is_null());
    }

    #[tokio::test]
    async fn test_status() {
        let response = app()
            .oneshot(Request::builder().uri("/api/agent/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body, json!({ "status": "stopped", "pid": null, "uptime": 0 }));
    }

    #[tokio::test]
    async fn test_stop_when_stopped() {
        let response = app()
            .oneshot(post_json("/api/agent/stop", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_start_requires_work_dir() {
        let response = app()
            .oneshot(post_json(
                "/api/agent/start",
                r#"{"envManager":"manual","pythonPath":"python3"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("working directory"));
    }

    #[tokio::test]
    async fn test_start_missing_manager_path() {
        let response = app()
            .oneshot(post_json(
                "/api/agent/start",
                r#"{"envManager":"poetry","workDir":"/tmp"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cleanup_nothing() {
        let response = app()
            .oneshot(post_json("/api/agent/cleanup", "{}"))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["cleanupCount"], 0);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/agent/start")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().contains_key("access-control-allow-origin"));
    }
}
