//! Typed wrappers over [`HttpClient`] for the log and MCP tool APIs.
//!
//! Paths are relative to the client's base URL, which already ends in
//! `/api`.
//!
//! | Wrapper | Method | Path |
//! |---------|--------|------|
//! | [`LogsApi::config`] | GET | `/logs/config` |
//! | [`LogsApi::level`] | GET | `/logs/level` |
//! | [`LogsApi::set_level`] | POST | `/logs/level` |
//! | [`LogsApi::recent`] | GET | `/logs/recent` |
//! | [`LogsApi::stats`] | GET | `/logs/stats` |
//! | [`LogsApi::clear`] | POST | `/logs/clear` |
//! | [`LogsApi::search`] | POST | `/logs/search` |
//! | [`McpApi::tools`] | GET | `/mcp/tools` |
//! | [`McpApi::tool`] | GET | `/mcp/tools/{name}` |
//! | [`McpApi::call_tool`] | POST | `/mcp/tools/{name}/call` |
//! | [`McpApi::tool_calls`] | GET | `/mcp/tools/calls` |
//! | [`McpApi::batch_call`] | POST | `/mcp/tools/batch` |

// ============================================================================
// Imports
// ============================================================================

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::client::HttpClient;
use super::error::{ApiError, ErrorCode};
use super::types::{ApiResponse, ApiResult, RequestOptions};

// ============================================================================
// Query Types
// ============================================================================

/// Filters for [`LogsApi::recent`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Filters for [`LogsApi::stats`]. List filters go out comma-joined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogStatsQuery {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub modules: Vec<String>,
    pub levels: Vec<String>,
}

impl LogStatsQuery {
    fn params(&self) -> Vec<(&'static str, Value)> {
        let joined = |items: &[String]| {
            if items.is_empty() {
                Value::Null
            } else {
                Value::from(items.join(","))
            }
        };
        vec![
            ("start_time", self.start_time.map_or(Value::Null, Value::from)),
            ("end_time", self.end_time.map_or(Value::Null, Value::from)),
            ("modules", joined(&self.modules)),
            ("levels", joined(&self.levels)),
        ]
    }
}

/// Filters for [`McpApi::tool_calls`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// `success`, `error` or `pending`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

// ============================================================================
// MCP Types
// ============================================================================

/// A tool exposed by the agent's MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the arguments.
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Response of [`McpApi::tools`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsResponse {
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub total: u64,
}

/// Arguments of a single tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub parameters: Map<String, Value>,
    #[serde(rename = "async", skip_serializing_if = "Option::is_none")]
    pub run_async: Option<bool>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// A recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Value,
    /// `success`, `error` or `pending`.
    pub status: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Response of [`McpApi::tool_calls`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallsResponse {
    #[serde(default)]
    pub calls: Vec<ToolCall>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub has_more: bool,
}

/// One entry of a batch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCall {
    pub tool_name: String,
    pub parameters: Map<String, Value>,
}

/// Request of [`McpApi::batch_call`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchCallRequest {
    pub calls: Vec<BatchCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequential: Option<bool>,
}

/// Response of [`McpApi::batch_call`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCallResponse {
    pub batch_id: String,
    #[serde(default)]
    pub results: Vec<ToolCall>,
    #[serde(default)]
    pub total_calls: u64,
    #[serde(default)]
    pub successful_calls: u64,
    #[serde(default)]
    pub failed_calls: u64,
}

// ============================================================================
// LogsApi
// ============================================================================

/// Agent log management endpoints.
///
/// Each call returns the normalized envelope; callers read `data`.
#[derive(Clone, Copy)]
pub struct LogsApi<'a> {
    client: &'a HttpClient,
}

impl<'a> LogsApi<'a> {
    /// Borrows `client`.
    #[inline]
    #[must_use]
    pub fn new(client: &'a HttpClient) -> Self {
        Self { client }
    }

    /// Logging configuration.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`ApiError`].
    pub async fn config(&self) -> ApiResult<ApiResponse> {
        self.client.get("/logs/config").await
    }

    /// Current log level.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`ApiError`].
    pub async fn level(&self) -> ApiResult<ApiResponse> {
        self.client.get("/logs/level").await
    }

    /// Changes the log level.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`ApiError`].
    pub async fn set_level(&self, level: &str) -> ApiResult<ApiResponse> {
        self.client.post("/logs/level", json!({ "level": level })).await
    }

    /// Recent log entries matching `query`.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`ApiError`].
    pub async fn recent(&self, query: &LogQuery) -> ApiResult<ApiResponse> {
        let params = to_params(query)?;
        self.client.get_with("/logs/recent", &borrowed(&params)).await
    }

    /// Aggregate counts by level and module.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`ApiError`].
    pub async fn stats(&self, query: &LogStatsQuery) -> ApiResult<ApiResponse> {
        self.client.get_with("/logs/stats", &query.params()).await
    }

    /// Clears the agent's log buffer.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`ApiError`].
    pub async fn clear(&self) -> ApiResult<ApiResponse> {
        self.client
            .request("/logs/clear", RequestOptions::new(Method::POST))
            .await
    }

    /// Full-text search; `query` is sent as the body unchanged.
    ///
    /// # Errors
    ///
    /// Propagates the client's [`ApiError`].
    pub async fn search(&self, query: Value) -> ApiResult<ApiResponse> {
        self.client.post("/logs/search", query).await
    }
}

// ============================================================================
// McpApi
// ============================================================================

/// MCP tool endpoints.
///
/// A 2xx reply whose envelope says `success: false` is an
/// [`ErrorCode::OperationFailed`] error carrying the server message.
#[derive(Clone, Copy)]
pub struct McpApi<'a> {
    client: &'a HttpClient,
}

impl<'a> McpApi<'a> {
    /// Borrows `client`.
    #[inline]
    #[must_use]
    pub fn new(client: &'a HttpClient) -> Self {
        Self { client }
    }

    /// Lists every tool.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport, status or envelope failure, or
    /// when `data` does not match [`ToolsResponse`].
    pub async fn tools(&self) -> ApiResult<ToolsResponse> {
        unwrap_data(self.client.get("/mcp/tools").await?)
    }

    /// Describes one tool.
    ///
    /// # Errors
    ///
    /// Same as [`tools`](Self::tools).
    pub async fn tool(&self, name: &str) -> ApiResult<McpTool> {
        unwrap_data(self.client.get(&format!("/mcp/tools/{name}")).await?)
    }

    /// Invokes a tool.
    ///
    /// # Errors
    ///
    /// Same as [`tools`](Self::tools).
    pub async fn call_tool(&self, name: &str, request: &ToolCallRequest) -> ApiResult<ToolCall> {
        let body = to_body(request)?;
        unwrap_data(self.client.post(&format!("/mcp/tools/{name}/call"), body).await?)
    }

    /// Call history matching `query`.
    ///
    /// # Errors
    ///
    /// Same as [`tools`](Self::tools).
    pub async fn tool_calls(&self, query: &ToolCallsQuery) -> ApiResult<ToolCallsResponse> {
        let params = to_params(query)?;
        unwrap_data(self.client.get_with("/mcp/tools/calls", &borrowed(&params)).await?)
    }

    /// Invokes several tools in one request.
    ///
    /// # Errors
    ///
    /// Same as [`tools`](Self::tools).
    pub async fn batch_call(&self, request: &BatchCallRequest) -> ApiResult<BatchCallResponse> {
        let body = to_body(request)?;
        unwrap_data(self.client.post("/mcp/tools/batch", body).await?)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn unwrap_data<T: DeserializeOwned>(response: ApiResponse) -> ApiResult<T> {
    if !response.success {
        let message = if response.message.is_empty() {
            "API request failed".to_string()
        } else {
            response.message
        };
        return Err(ApiError::new(ErrorCode::OperationFailed, message));
    }
    response.data_as()
}

fn to_body<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        ApiError::new(ErrorCode::InvalidParameter, format!("Unserializable request: {e}"))
    })
}

fn to_params<T: Serialize>(query: &T) -> ApiResult<Map<String, Value>> {
    match to_body(query)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn borrowed(params: &Map<String, Value>) -> Vec<(&str, Value)> {
    params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_query_skips_unset_filters() {
        let query = LogQuery {
            limit: Some(50),
            level: Some("ERROR".into()),
            ..LogQuery::default()
        };
        let params = to_params(&query).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["limit"], 50);
        assert_eq!(params["level"], "ERROR");
    }

    #[test]
    fn test_stats_lists_are_comma_joined() {
        let query = LogStatsQuery {
            modules: vec!["agent".into(), "mcp".into()],
            ..LogStatsQuery::default()
        };
        let params = query.params();
        assert!(params.contains(&("modules", Value::from("agent,mcp"))));
        assert!(params.contains(&("levels", Value::Null)));
    }

    #[test]
    fn test_failed_envelope_is_an_error() {
        let response = ApiResponse::from_body(json!({ "isSuccess": false, "message": "tool disabled" }));
        let err = unwrap_data::<Value>(response).unwrap_err();
        assert_eq!(err.error_code, ErrorCode::OperationFailed);
        assert_eq!(err.message, "tool disabled");
    }

    #[test]
    fn test_tool_call_request_uses_async_key() {
        let request = ToolCallRequest {
            run_async: Some(true),
            ..ToolCallRequest::default()
        };
        let body = to_body(&request).unwrap();
        assert_eq!(body["async"], true);
        assert!(body.get("timeout").is_none());
    }
}
