//! Typed view of inbound frames.
//!
//! Frames stay untyped JSON on the wire and in handlers; [`ParsedFrame`]
//! classifies them by `type` for the consumers that care (the heartbeat and
//! the data store).
//!
//! # Frame Types
//!
//! | `type` | Variant |
//! |--------|---------|
//! | `pong` | [`ParsedFrame::Pong`] |
//! | `player_update` | [`ParsedFrame::PlayerUpdate`] |
//! | `world_update` | [`ParsedFrame::WorldUpdate`] |
//! | `log`, `log_entry` | [`ParsedFrame::Log`] |
//! | `subscribed` | [`ParsedFrame::Subscribed`] |
//! | `token_usage_update`, `usage_response` | [`ParsedFrame::TokenUsage`] |
//! | `tasks_list`, `tasks_update` | [`ParsedFrame::Tasks`] |
//! | `task_added`, `task_updated`, `task_deleted`, `task_marked_done` | [`ParsedFrame::TaskAck`] |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use super::message::message_type;

// ============================================================================
// ParsedFrame
// ============================================================================

/// Inbound frame classified by its `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFrame<'a> {
    /// Heartbeat reply.
    Pong {
        /// Server timestamp, if sent.
        timestamp: Option<i64>,
    },

    /// Player state patch.
    PlayerUpdate {
        /// Fields to merge.
        data: &'a Value,
    },

    /// World state patch.
    WorldUpdate {
        /// Fields to merge.
        data: &'a Value,
    },

    /// Log line. The whole frame carries the entry fields.
    Log {
        /// The raw frame.
        entry: &'a Value,
    },

    /// Subscription acknowledgement.
    Subscribed {
        /// Server-echoed subscription, if any.
        subscription: Option<&'a Value>,
    },

    /// Token usage push or query response.
    TokenUsage {
        /// Usage payload.
        data: &'a Value,
    },

    /// Full task list.
    Tasks {
        /// `data.tasks`, if present.
        tasks: Option<&'a Value>,
    },

    /// Single task operation acknowledgement.
    TaskAck {
        /// The operation type.
        kind: &'a str,
    },

    /// Any other typed frame.
    Other {
        /// The `type` value.
        kind: &'a str,
    },

    /// Frame without a string `type`.
    Untyped,
}

/// Classifies a raw frame.
#[must_use]
pub fn parse_frame(frame: &Value) -> ParsedFrame<'_> {
    static NULL: Value = Value::Null;

    let Some(kind) = message_type(frame) else {
        return ParsedFrame::Untyped;
    };
    let data = frame.get("data").unwrap_or(&NULL);

    match kind {
        "pong" => ParsedFrame::Pong {
            timestamp: frame.get("timestamp").and_then(Value::as_i64),
        },
        "player_update" => ParsedFrame::PlayerUpdate { data },
        "world_update" => ParsedFrame::WorldUpdate { data },
        "log" | "log_entry" => ParsedFrame::Log { entry: frame },
        "subscribed" => ParsedFrame::Subscribed {
            subscription: frame.get("subscription"),
        },
        "token_usage_update" | "usage_response" => ParsedFrame::TokenUsage { data },
        "tasks_list" | "tasks_update" => ParsedFrame::Tasks {
            tasks: data.get("tasks"),
        },
        "task_added" | "task_updated" | "task_deleted" | "task_marked_done" => {
            ParsedFrame::TaskAck { kind }
        }
        _ => ParsedFrame::Other { kind },
    }
}

// ============================================================================
// Tests
// ============================================================================
