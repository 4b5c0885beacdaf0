//! Endpoint table and link settings.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `endpoint` | Logical endpoints and per-endpoint connection parameters |
//! | `settings` | HTTP and WebSocket settings, env loading, validation |

// ============================================================================
// Submodules
// ============================================================================

/// Logical endpoints and per-endpoint connection parameters.
pub mod endpoint;

/// HTTP and WebSocket settings.
pub mod settings;

// ============================================================================
// Re-exports
// ============================================================================

pub use endpoint::{Endpoint, EndpointConfig, EndpointTable};
pub use settings::{HttpSettings, LinkConfig, LinkConfigBuilder, WsSettings};
