//! REST client for the agent API.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | [`HttpClient`] with retries and verb helpers |
//! | `error` | [`ApiError`] and the [`ErrorCode`] taxonomy |
//! | `error_log` | [`ErrorReporter`], a bounded classified error log |
//! | `interceptors` | Priority-ordered request/response interceptors |
//! | `services` | Typed log and MCP tool wrappers |
//! | `types` | Request options and the normalized response envelope |
//!
//! # Example
//!
//! ```no_run
//! use maicraft_link::http::{HttpClient, register_auth};
//! use maicraft_link::LinkConfig;
//!
//! # async fn run() -> maicraft_link::Result<()> {
//! let client = HttpClient::from_config(&LinkConfig::from_env())?;
//! register_auth(client.interceptors(), Some("token".into()));
//!
//! let tasks = client.get("/tasks").await?;
//! println!("{}", tasks.data);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Retrying HTTP client.
pub mod client;

/// Error taxonomy.
pub mod error;

/// Bounded error log.
pub mod error_log;

/// Request and response interceptors.
pub mod interceptors;

/// Typed log and MCP tool wrappers.
pub mod services;

/// Request and response shapes.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::HttpClient;
pub use error::{ApiError, ErrorCode};
pub use error_log::{
    DEFAULT_MAX_ERRORS, ErrorCallback, ErrorKind, ErrorLevel, ErrorRecord, ErrorReporter,
    ErrorStats, ReporterConfig,
};
pub use interceptors::{
    AuthInterceptor, InterceptorChain, InterceptorOptions, InterceptorPriority,
    LoggingInterceptor, RequestInterceptor, ResponseInterceptor, register_auth, register_logging,
};
pub use services::{
    BatchCall, BatchCallRequest, BatchCallResponse, LogQuery, LogStatsQuery, LogsApi, McpApi,
    McpTool, ToolCall, ToolCallRequest, ToolCallsQuery, ToolCallsResponse, ToolsResponse,
};
pub use types::{
    ApiResponse, ApiResult, BatchRequest, PreparedRequest, RequestOptions, normalize_fields,
};
