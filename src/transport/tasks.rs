//! Typed senders for the task manager endpoint.
//!
//! Unlike [`Client::send_message`], which drops frames silently when the
//! transport is down, every sender here fails with
//! [`Error::Connection`](crate::Error::Connection) so callers can surface it.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::config::Endpoint;
use crate::error::{Error, Result};
use crate::protocol::TaskCommand;

use super::client::Client;
use super::registry::Registry;

// ============================================================================
// TaskManager
// ============================================================================

/// Sends task commands over a `TASK_MANAGER` client.
///
/// # Example
///
/// ```no_run
/// use maicraft_link::Registry;
/// use maicraft_link::transport::TaskManager;
///
/// # async fn run() -> maicraft_link::Result<()> {
/// let registry = Registry::default();
/// let tasks = TaskManager::from_registry(&registry);
/// tasks.client().connect().await?;
///
/// tasks.add_task("collect wood", "16 oak logs", None)?;
/// tasks.get_tasks()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaskManager {
    client: Client,
}

impl TaskManager {
    /// Wraps an existing client.
    #[inline]
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Wraps the registry's `TASK_MANAGER` client.
    #[must_use]
    pub fn from_registry(registry: &Registry) -> Self {
        Self::new(registry.get_manager(Endpoint::TaskManager))
    }

    /// Returns the underlying client.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Requests the task list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the client is not connected or the
    /// frame could not be queued.
    pub fn get_tasks(&self) -> Result<()> {
        self.send(&TaskCommand::GetTasks)
    }

    /// Creates a task. An empty `progress` is not sent.
    ///
    /// # Errors
    ///
    /// Same as [`get_tasks`](Self::get_tasks).
    pub fn add_task(&self, details: &str, done_criteria: &str, progress: Option<&str>) -> Result<()> {
        self.send(&TaskCommand::add(details, done_criteria, progress.map(str::to_string)))
    }

    /// Replaces the progress note of `task_id`.
    ///
    /// # Errors
    ///
    /// Same as [`get_tasks`](Self::get_tasks).
    pub fn update_task_progress(&self, task_id: &str, progress: &str) -> Result<()> {
        self.send(&TaskCommand::update(task_id, progress))
    }

    /// Deletes `task_id`.
    ///
    /// # Errors
    ///
    /// Same as [`get_tasks`](Self::get_tasks).
    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        self.send(&TaskCommand::delete(task_id))
    }

    /// Marks `task_id` as done.
    ///
    /// # Errors
    ///
    /// Same as [`get_tasks`](Self::get_tasks).
    pub fn mark_task_done(&self, task_id: &str) -> Result<()> {
        self.send(&TaskCommand::mark_done(task_id))
    }

    fn send(&self, command: &TaskCommand) -> Result<()> {
        if !self.client.is_connected() {
            return Err(Error::connection(format!(
                "{} is not connected, cannot send {}",
                self.client.name(),
                command.kind()
            )));
        }

        if !self.client.send_message(command) {
            return Err(Error::connection(format!(
                "Failed to send {} to {}",
                command.kind(),
                self.client.name()
            )));
        }

        debug!(endpoint = %self.client.name(), command = command.kind(), "Task command sent");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    #[test]
    fn test_disconnected_commands_fail() {
        let tasks = TaskManager::new(Client::new(
            "TASK_MANAGER",
            EndpointConfig::new("ws://127.0.0.1:1/ws/task-manager"),
        ));

        let err = tasks.get_tasks().unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        assert!(err.to_string().contains("get_tasks"));

        assert!(tasks.add_task("a", "b", Some("c")).is_err());
        assert!(tasks.update_task_progress("t", "p").is_err());
        assert!(tasks.delete_task("t").is_err());
        assert!(tasks.mark_task_done("t").is_err());
    }

    #[test]
    fn test_from_registry_shares_client() {
        let registry = Registry::default();
        let tasks = TaskManager::from_registry(&registry);
        assert!(tasks.client().ptr_eq(&registry.get_manager(Endpoint::TaskManager)));
        assert_eq!(tasks.client().name(), "TASK_MANAGER");
    }
}
