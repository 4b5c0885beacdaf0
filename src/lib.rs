//! Maicraft link - live data plumbing for the Maicraft agent dashboard.
//!
//! This library keeps one reconnecting WebSocket connection per logical
//! endpoint of the Maicraft agent, mirrors the JSON frames those endpoints
//! push into a shared data store, and talks to the agent's REST API through
//! a retrying HTTP client.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                             Hub                              │
//! │  ┌──────────────┐   frames    ┌──────────────┐               │
//! │  │   Registry   │────────────►│  DataStore   │               │
//! │  │ PLAYER  ─► Client          │  player      │               │
//! │  │ WORLD   ─► Client          │  world       │               │
//! │  │ LOGS    ─► Client          │  logs (ring) │               │
//! │  │ ...                        │  ...         │               │
//! │  └──────────────┘             └──────────────┘               │
//! └──────────────────────────────────────────────────────────────┘
//!            ▲  ws://localhost:20914/ws/...
//!            │
//!     Maicraft agent (or the mock server)
//! ```
//!
//! Key design principles:
//!
//! - Each [`Client`] owns one transport, one event loop and its handlers
//! - At most one live transport per endpoint name
//! - Messages are untyped JSON objects with a `type` discriminator
//! - `disconnect()` is final; only unexpected closes trigger reconnection
//!
//! # Quick Start
//!
//! ```no_run
//! use maicraft_link::{Endpoint, Hub, LinkConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let hub = Hub::new(LinkConfig::from_env())?;
//!
//!     hub.connect_all().await?;
//!
//!     let player = hub.store().player();
//!     println!("player: {player:?}");
//!
//!     hub.disconnect_all();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`agent`] | Agent process supervisor and REST proxy |
//! | [`config`] | Endpoint table and link settings |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`http`] | Retrying REST client, error taxonomy, interceptors |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`mock`] | Mock WebSocket server and data generators |
//! | [`protocol`] | JSON envelope types |
//! | [`release`] | Version bump, changelog and backup tooling |
//! | [`store`] | Data store, log ring buffer, connection supervisor |
//! | [`transport`] | Reconnecting WebSocket client and registry |

// ============================================================================
// Modules
// ============================================================================

/// Agent process supervisor and REST proxy.
pub mod agent;

/// Endpoint table and link settings.
///
/// Use [`LinkConfig::builder()`] or [`LinkConfig::from_env()`].
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Retrying REST client for the agent API.
pub mod http;

/// Type-safe identifiers for handlers, interceptors and error records.
pub mod identifiers;

/// Mock WebSocket server and mock-data generators.
pub mod mock;

/// WebSocket JSON envelope types.
pub mod protocol;

/// Version bump, changelog and backup tooling.
pub mod release;

/// Data store and connection supervisor.
pub mod store;

/// Reconnecting WebSocket client and endpoint registry.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Config types
pub use config::{Endpoint, EndpointConfig, EndpointTable, LinkConfig, LinkConfigBuilder};

// Error types
pub use error::{Error, Result};

// HTTP types
pub use http::{ApiError, ErrorCode, ErrorReporter, HttpClient, RequestOptions};

// Identifier types
pub use identifiers::{ErrorId, HandlerId, InterceptorId};

// Protocol types
pub use protocol::{Envelope, SubscribeRequest, TaskCommand};

// Store types
pub use store::{DataStore, GlobalStatus, Hub, LogEntry};

// Transport types
pub use transport::{Client, ConnectionState, Registry, TaskManager};
