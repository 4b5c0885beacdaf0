//! WebSocket JSON envelope types.
//!
//! The wire format is deliberately thin: every frame is a JSON object with a
//! `type` discriminator and endpoint-specific fields. There is no schema
//! validation and no protocol versioning.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `ping` / `pong` | Client ↔ Server | Heartbeat |
//! | `subscribe` / `unsubscribe` | Client → Server | Start or stop pushes |
//! | `get_tasks`, `add_task`, ... | Client → Server | Task manager commands |
//! | `*_update`, `log`, `tasks_*` | Server → Client | State pushes |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frames` | Typed classification of inbound frames |
//! | `message` | Envelope and subscribe request types |
//! | `task` | Task manager commands |

// ============================================================================
// Submodules
// ============================================================================

/// Typed classification of inbound frames.
pub mod frames;

/// Envelope and subscribe request types.
pub mod message;

/// Task manager commands.
pub mod task;

// ============================================================================
// Re-exports
// ============================================================================

pub use frames::{ParsedFrame, parse_frame};
pub use message::{DEFAULT_LOG_LEVELS, Envelope, SubscribeRequest, message_type};
pub use task::TaskCommand;
