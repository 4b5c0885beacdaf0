//! Agent process supervisor.
//!
//! At most one agent runs at a time. Its lifecycle is:
//!
//! ```text
//! Stopped ──start──► Starting ──grace elapsed, alive──► Running
//!    ▲                  │                                  │
//!    │                  └── exited during grace ───────────┤
//!    │                                                     │ stop
//!    └──────────── exited / killed ◄──── Stopping ◄────────┘
//! ```
//!
//! Stop sends `SIGTERM` to the agent's process group (`taskkill /t /f` on
//! Windows) and kills it if it is still alive after the stop grace period.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};

use crate::error::{Error, Result};

use super::decode::decode_output;
use super::launcher::{EnvManager, Platform, StartRequest, conda_env_exists, start_command};

// ============================================================================
// Constants
// ============================================================================

/// How long a fresh process must survive to count as started.
pub const DEFAULT_START_GRACE: Duration = Duration::from_secs(3);

/// How long a stopping process gets before it is killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Body of `GET /api/agent/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: AgentStatus,
    pub pid: Option<u32>,
    /// Milliseconds since launch; 0 when stopped.
    pub uptime: u64,
}

/// A resolved launch: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl AgentCommand {
    /// Runs `command` through the platform shell in `cwd`.
    #[must_use]
    pub fn shell(command: &str, cwd: impl Into<PathBuf>) -> Self {
        let (program, args) = Platform::current().shell(command);
        Self {
            program: program.to_string(),
            args,
            cwd: cwd.into(),
        }
    }

    /// Resolves a start request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the request is incomplete or
    /// names a conda environment that does not exist.
    pub async fn resolve(request: &StartRequest) -> Result<Self> {
        let cwd = request.work_dir()?;
        if request.env_manager == EnvManager::Conda && !conda_env_exists(&request.env_name).await {
            return Err(Error::invalid_argument(format!(
                "conda environment '{}' does not exist",
                request.env_name
            )));
        }
        let command = start_command(request, Platform::current())?;
        Ok(Self::shell(&command, cwd))
    }
}

struct Managed {
    generation: u64,
    pid: Option<u32>,
    started_at: Instant,
    kill: Option<oneshot::Sender<()>>,
    exited: watch::Receiver<bool>,
}

#[derive(Default)]
struct Inner {
    status: AgentStatus,
    generation: u64,
    process: Option<Managed>,
}

// ============================================================================
// AgentSupervisor
// ============================================================================

/// Owns the agent child process.
///
/// Thread-safe; share it behind an `Arc`.
pub struct AgentSupervisor {
    inner: Arc<Mutex<Inner>>,
    start_grace: Duration,
    stop_grace: Duration,
}

impl Default for AgentSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSupervisor")
            .field("status", &self.inner.lock().status)
            .field("start_grace", &self.start_grace)
            .field("stop_grace", &self.stop_grace)
            .finish()
    }
}

impl AgentSupervisor {
    /// Creates a supervisor with the default grace periods.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            start_grace: DEFAULT_START_GRACE,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Overrides the start and stop grace periods.
    #[must_use]
    pub fn with_grace(mut self, start: Duration, stop: Duration) -> Self {
        self.start_grace = start;
        self.stop_grace = stop;
        self
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        let process = inner.process.as_ref();
        StatusSnapshot {
            status: inner.status,
            pid: process.and_then(|p| p.pid),
            uptime: process.map_or(0, |p| p.started_at.elapsed().as_millis() as u64),
        }
    }
}

// ============================================================================
// AgentSupervisor - Start
// ============================================================================

impl AgentSupervisor {
    /// Resolves and launches a start request.
    ///
    /// # Errors
    ///
    /// See [`resolve`](AgentCommand::resolve) and [`launch`](Self::launch).
    pub async fn start(&self, request: &StartRequest) -> Result<StatusSnapshot> {
        self.begin_start()?;
        info!(manager = ?request.env_manager, work_dir = ?request.work_dir, "Starting agent");

        let command = match AgentCommand::resolve(request).await {
            Ok(command) => command,
            Err(e) => {
                self.inner.lock().status = AgentStatus::Stopped;
                return Err(e);
            }
        };
        self.spawn_and_wait(command).await
    }

    /// Launches `command` and waits out the start grace period.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Agent`] if an agent is already running or starting,
    /// and [`Error::ProcessLaunchFailed`] if it cannot be spawned or exits
    /// during the grace period.
    pub async fn launch(&self, command: AgentCommand) -> Result<StatusSnapshot> {
        self.begin_start()?;
        self.spawn_and_wait(command).await
    }

    fn begin_start(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.status {
            AgentStatus::Running => Err(Error::agent("Agent is already running")),
            AgentStatus::Starting => Err(Error::agent("Agent is starting, please wait")),
            AgentStatus::Stopping => Err(Error::agent("Agent is stopping, please wait")),
            AgentStatus::Stopped => {
                inner.status = AgentStatus::Starting;
                Ok(())
            }
        }
    }

    async fn spawn_and_wait(&self, command: AgentCommand) -> Result<StatusSnapshot> {
        let generation = match self.spawn(&command) {
            Ok(generation) => generation,
            Err(e) => {
                error!("Agent failed to launch: {e}");
                self.inner.lock().status = AgentStatus::Stopped;
                return Err(e);
            }
        };

        tokio::time::sleep(self.start_grace).await;

        let mut inner = self.inner.lock();
        let alive = inner
            .process
            .as_ref()
            .is_some_and(|p| p.generation == generation && !*p.exited.borrow());
        if alive && inner.status == AgentStatus::Starting {
            inner.status = AgentStatus::Running;
            drop(inner);
            info!("Agent running");
            Ok(self.status())
        } else {
            inner.status = AgentStatus::Stopped;
            inner.process = None;
            Err(Error::ProcessLaunchFailed {
                message: "agent exited during startup, check the logs".to_string(),
            })
        }
    }

    fn spawn(&self, command: &AgentCommand) -> Result<u64> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(Error::process_launch_failed)?;
        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, true));
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        let (exited_tx, exited_rx) = watch::channel(false);

        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.process = Some(Managed {
                generation: inner.generation,
                pid,
                started_at: Instant::now(),
                kill: Some(kill_tx),
                exited: exited_rx,
            });
            inner.generation
        };
        info!(?pid, "Agent process spawned");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        warn!("Failed to kill agent: {e}");
                    }
                    child.wait().await
                }
            };
            match status {
                Ok(status) => info!(%status, "Agent process exited"),
                Err(e) => warn!("Failed to reap agent: {e}"),
            }
            let _ = exited_tx.send(true);

            let mut inner = inner.lock();
            if inner.process.as_ref().is_some_and(|p| p.generation == generation) {
                inner.process = None;
                inner.status = AgentStatus::Stopped;
            }
        });

        Ok(generation)
    }
}

async fn forward_output<R: AsyncRead + Unpin>(stream: R, is_stderr: bool) {
    let mut lines = BufReader::new(stream).split(b'\n');
    while let Ok(Some(line)) = lines.next_segment().await {
        let text = decode_output(&line);
        if text.is_empty() {
            continue;
        }
        if is_stderr {
            warn!(target: "maicraft_link::agent::output", "{text}");
        } else {
            info!(target: "maicraft_link::agent::output", "{text}");
        }
    }
}

// ============================================================================
// AgentSupervisor - Stop
// ============================================================================

impl AgentSupervisor {
    /// Stops the running agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Agent`] if no agent is running or the platform
    /// kill command fails.
    pub async fn stop(&self) -> Result<()> {
        let (pid, mut exited) = {
            let mut inner = self.inner.lock();
            let Some(process) = inner.process.as_ref().filter(|_| inner.status == AgentStatus::Running)
            else {
                return Err(Error::agent("Agent is not running"));
            };
            let found = (process.pid, process.exited.clone());
            inner.status = AgentStatus::Stopping;
            found
        };
        info!(?pid, "Stopping agent");

        if let Some(pid) = pid
            && let Err(e) = terminate(pid).await
        {
            error!("Failed to stop agent: {e}");
            self.inner.lock().status = AgentStatus::Running;
            return Err(e);
        }

        let graceful = tokio::time::timeout(self.stop_grace, exited.wait_for(|done| *done))
            .await
            .is_ok();
        if !graceful {
            warn!("Agent ignored SIGTERM, killing it");
            self.kill_managed();
            let _ = tokio::time::timeout(self.stop_grace, exited.wait_for(|done| *done)).await;
        }

        let mut inner = self.inner.lock();
        inner.process = None;
        inner.status = AgentStatus::Stopped;
        info!("Agent stopped");
        Ok(())
    }

    /// Kills the managed agent, if any, and resets the state.
    ///
    /// Returns the number of processes killed.
    pub async fn cleanup(&self) -> usize {
        let exited = self.inner.lock().process.as_ref().map(|p| p.exited.clone());
        let Some(mut exited) = exited else {
            self.inner.lock().status = AgentStatus::Stopped;
            return 0;
        };

        info!("Cleaning up agent process");
        self.kill_managed();
        let _ = tokio::time::timeout(self.stop_grace, exited.wait_for(|done| *done)).await;

        let mut inner = self.inner.lock();
        inner.process = None;
        inner.status = AgentStatus::Stopped;
        1
    }

    /// Kills the agent without waiting; used on proxy shutdown.
    pub fn shutdown(&self) {
        if self.kill_managed() {
            info!("Agent killed on shutdown");
        }
    }

    fn kill_managed(&self) -> bool {
        let kill = self
            .inner
            .lock()
            .process
            .as_mut()
            .and_then(|p| p.kill.take());
        match kill {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Asks the agent's process tree to terminate.
async fn terminate(pid: u32) -> Result<()> {
    let (program, args): (&str, Vec<String>) = if cfg!(windows) {
        (
            "taskkill",
            vec!["/pid".into(), pid.to_string(), "/t".into(), "/f".into()],
        )
    } else {
        // Negative pid: the whole process group created at spawn.
        ("kill", vec!["-TERM".into(), "--".into(), format!("-{pid}")])
    };

    let output = Command::new(program)
        .args(&args)
        .output()
        .await
        .map_err(|e| Error::agent(format!("{program} failed: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(Error::agent(format!(
            "{program} failed: {}",
            decode_output(&output.stderr)
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> AgentSupervisor {
        AgentSupervisor::new().with_grace(Duration::from_millis(200), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_initial_status() {
        let supervisor = AgentSupervisor::new();
        let status = supervisor.status();
        assert_eq!(status.status, AgentStatus::Stopped);
        assert_eq!(status.pid, None);
        assert_eq!(status.uptime, 0);
    }

    #[tokio::test]
    async fn test_stop_when_not_running() {
        let supervisor = AgentSupervisor::new();
        assert!(matches!(supervisor.stop().await, Err(Error::Agent { .. })));
    }

    #[tokio::test]
    async fn test_cleanup_without_process() {
        assert_eq!(AgentSupervisor::new().cleanup().await, 0);
    }

    #[tokio::test]
    async fn test_start_rejects_blank_work_dir() {
        let supervisor = AgentSupervisor::new();
        let request = StartRequest {
            env_manager: EnvManager::Manual,
            python_path: Some("python3".into()),
            ..StartRequest::default()
        };
        assert!(matches!(
            supervisor.start(&request).await,
            Err(Error::InvalidArgument { .. })
        ));
        assert_eq!(supervisor.status().status, AgentStatus::Stopped);
    }

    #[tokio::test]
    async fn test_launch_missing_program() {
        let supervisor = fast();
        let command = AgentCommand {
            program: "definitely-not-a-real-binary-4c1f".into(),
            args: Vec::new(),
            cwd: std::env::temp_dir(),
        };
        assert!(matches!(
            supervisor.launch(command).await,
            Err(Error::ProcessLaunchFailed { .. })
        ));
        assert_eq!(supervisor.status().status, AgentStatus::Stopped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_exiting_during_grace_fails_start() {
        let supervisor = fast();
        let result = supervisor
            .launch(AgentCommand::shell("exit 3", std::env::temp_dir()))
            .await;
        assert!(matches!(result, Err(Error::ProcessLaunchFailed { .. })));
        assert_eq!(supervisor.status().status, AgentStatus::Stopped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_then_stop() {
        let supervisor = fast();
        let status = supervisor
            .launch(AgentCommand::shell("echo ready; sleep 30", std::env::temp_dir()))
            .await
            .unwrap();
        assert_eq!(status.status, AgentStatus::Running);
        assert!(status.pid.is_some());

        let again = supervisor
            .launch(AgentCommand::shell("sleep 30", std::env::temp_dir()))
            .await;
        assert!(matches!(again, Err(Error::Agent { .. })));

        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.status().status, AgentStatus::Stopped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cleanup_kills_running_agent() {
        let supervisor = fast();
        supervisor
            .launch(AgentCommand::shell("sleep 30", std::env::temp_dir()))
            .await
            .unwrap();

        assert_eq!(supervisor.cleanup().await, 1);
        assert_eq!(supervisor.status().status, AgentStatus::Stopped);
    }
}
