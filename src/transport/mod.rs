//! WebSocket transport layer.
//!
//! This module keeps one reconnecting connection per logical endpoint of the
//! Maicraft agent.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Registry       │                              │  Maicraft agent │
//! │                 │         WebSocket            │                 │
//! │  Client ────────┼─────────────────────────────►│  /ws/game/...   │
//! │  (per endpoint) │      localhost:20914         │  /ws/logs ...   │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Registry::get_manager` - Create or fetch the endpoint's client
//! 2. `Client::connect` - Open the transport, start the heartbeat
//! 3. `Client::subscribe` - Ask the server to start pushing
//! 4. Handlers receive frames until the transport closes
//! 5. `Client::disconnect` - Close for good (no reconnect)
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Reconnecting client and event loop |
//! | `handlers` | Handler lists with stable IDs |
//! | `registry` | One client per endpoint name |
//! | `tasks` | Typed task manager senders |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnecting client and event loop.
pub mod client;

/// Handler lists with stable IDs.
pub mod handlers;

/// One client per endpoint name.
pub mod registry;

/// Typed task manager senders.
pub mod tasks;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{Client, ConnectionState};
pub use handlers::{CloseHandler, ConnectionHandler, ErrorHandler, HandlerList, MessageHandler};
pub use registry::Registry;
pub use tasks::TaskManager;

pub(crate) use client::now_ms;
