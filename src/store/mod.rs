//! Mirrored endpoint state and the connection supervisor.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `data` | Latest state per endpoint, `(endpoint, type)` dispatch |
//! | `log_buffer` | 1000-entry FIFO buffer of normalized log lines |
//! | `status` | Aggregate connection status |
//! | `supervisor` | [`Hub`]: connect all, attach handlers, auto-subscribe |

// ============================================================================
// Submodules
// ============================================================================

/// Latest state per endpoint.
pub mod data;

/// Bounded FIFO log buffer.
pub mod log_buffer;

/// Aggregate connection status.
pub mod status;

/// Connection supervisor.
pub mod supervisor;

// ============================================================================
// Re-exports
// ============================================================================

pub use data::{
    Applied, DataStore, EndpointStats, Equipment, Inventory, Location, PlayerData, Position,
    TaskData, Weather, WorldData, WorldTime, merge_shallow,
};
pub use log_buffer::{LOG_CAPACITY, LogBuffer, LogEntry};
pub use status::{EndpointDetails, GlobalStatus, MAX_ERROR_LEN, format_error};
pub use supervisor::{HUB_ENDPOINTS, Hub, SUBSCRIBE_DELAY, SubscriptionPlan};
