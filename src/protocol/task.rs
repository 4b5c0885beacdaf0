//! Task manager commands.
//!
//! The `TASK_MANAGER` endpoint accepts five commands. The server answers
//! each one by pushing a fresh task list.
//!
//! | Command | Shape |
//! |---------|-------|
//! | List | `{"type":"get_tasks"}` |
//! | Add | `{"type":"add_task","details","done_criteria","progress"?}` |
//! | Progress | `{"type":"update_task","task_id","progress"}` |
//! | Delete | `{"type":"delete_task","task_id"}` |
//! | Done | `{"type":"mark_done","task_id"}` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// TaskCommand
// ============================================================================

/// A command sent to the task manager endpoint.
///
/// # Example
///
/// ```
/// use maicraft_link::protocol::TaskCommand;
///
/// let json = serde_json::to_value(TaskCommand::mark_done("t-1")).unwrap();
/// assert_eq!(json["type"], "mark_done");
/// assert_eq!(json["task_id"], "t-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskCommand {
    /// Requests the current task list.
    GetTasks,

    /// Creates a task.
    AddTask {
        details: String,
        done_criteria: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<String>,
    },

    /// Replaces a task's progress note.
    UpdateTask { task_id: String, progress: String },

    /// Removes a task.
    DeleteTask { task_id: String },

    /// Marks a task as done.
    MarkDone { task_id: String },
}

impl TaskCommand {
    /// Builds an `add_task` command. An empty `progress` is omitted.
    #[must_use]
    pub fn add(
        details: impl Into<String>,
        done_criteria: impl Into<String>,
        progress: Option<String>,
    ) -> Self {
        Self::AddTask {
            details: details.into(),
            done_criteria: done_criteria.into(),
            progress: progress.filter(|p| !p.is_empty()),
        }
    }

    /// Builds an `update_task` command.
    #[inline]
    #[must_use]
    pub fn update(task_id: impl Into<String>, progress: impl Into<String>) -> Self {
        Self::UpdateTask {
            task_id: task_id.into(),
            progress: progress.into(),
        }
    }

    /// Builds a `delete_task` command.
    #[inline]
    #[must_use]
    pub fn delete(task_id: impl Into<String>) -> Self {
        Self::DeleteTask {
            task_id: task_id.into(),
        }
    }

    /// Builds a `mark_done` command.
    #[inline]
    #[must_use]
    pub fn mark_done(task_id: impl Into<String>) -> Self {
        Self::MarkDone {
            task_id: task_id.into(),
        }
    }

    /// Returns the wire `type` of this command.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetTasks => "get_tasks",
            Self::AddTask { .. } => "add_task",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::MarkDone { .. } => "mark_done",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_tasks_is_bare() {
        let json = serde_json::to_value(TaskCommand::GetTasks).unwrap();
        assert_eq!(json, json!({ "type": "get_tasks" }));
    }

    #[test]
    fn test_add_task_omits_empty_progress() {
        let json = serde_json::to_value(TaskCommand::add("mine logs", "10 logs", Some(String::new()))).unwrap();
        assert_eq!(
            json,
            json!({ "type": "add_task", "details": "mine logs", "done_criteria": "10 logs" })
        );

        let json = serde_json::to_value(TaskCommand::add("mine logs", "10 logs", None)).unwrap();
        assert!(json.get("progress").is_none());
    }

    #[test]
    fn test_add_task_keeps_progress() {
        let json = serde_json::to_value(TaskCommand::add("build hut", "roof done", Some("walls".into()))).unwrap();
        assert_eq!(json["progress"], "walls");
    }

    #[test]
    fn test_task_id_commands() {
        let update = serde_json::to_value(TaskCommand::update("t-7", "half")).unwrap();
        assert_eq!(update, json!({ "type": "update_task", "task_id": "t-7", "progress": "half" }));

        let delete = serde_json::to_value(TaskCommand::delete("t-7")).unwrap();
        assert_eq!(delete, json!({ "type": "delete_task", "task_id": "t-7" }));

        let done = serde_json::to_value(TaskCommand::mark_done("t-7")).unwrap();
        assert_eq!(done, json!({ "type": "mark_done", "task_id": "t-7" }));
    }

    #[test]
    fn test_kind_matches_wire_type() {
        for command in [
            TaskCommand::GetTasks,
            TaskCommand::add("a", "b", None),
            TaskCommand::update("t", "p"),
            TaskCommand::delete("t"),
            TaskCommand::mark_done("t"),
        ] {
            let json = serde_json::to_value(&command).unwrap();
            assert_eq!(json["type"], command.kind());
        }
    }

    #[test]
    fn test_parses_from_wire() {
        let command: TaskCommand =
            serde_json::from_value(json!({ "type": "delete_task", "task_id": "x" })).unwrap();
        assert_eq!(command, TaskCommand::delete("x"));
    }
}
