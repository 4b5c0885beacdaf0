//! Mock Maicraft agent for local development and tests.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `generators` | Random player, world, log, token usage and task data |
//! | `server` | [`MockServer`], a WebSocket server pushing that data |

// ============================================================================
// Submodules
// ============================================================================

/// Random game data.
pub mod generators;

/// Mock WebSocket server.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use server::{DEFAULT_MOCK_PORT, MockConfig, MockServer, MockServerHandle, scripted_or_random_log};
