//! Agent process supervisor and REST proxy.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `decode` | Lossy UTF-8 decoding of child output |
//! | `launcher` | Start requests, launch commands, environment discovery |
//! | `process` | [`AgentSupervisor`], the single-agent lifecycle |
//! | `server` | axum router and server |

// ============================================================================
// Submodules
// ============================================================================

/// Child output decoding.
pub mod decode;

/// Launch commands and environment discovery.
pub mod launcher;

/// Agent process supervisor.
pub mod process;

/// REST proxy.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use decode::decode_output;
pub use launcher::{
    CondaEnv, DEFAULT_CONDA_ENV, EnvManager, Platform, StartRequest, SystemEnvs,
    detect_system_envs, list_conda_envs, parse_conda_envs, start_command,
};
pub use process::{
    AgentCommand, AgentStatus, AgentSupervisor, DEFAULT_START_GRACE, DEFAULT_STOP_GRACE,
    StatusSnapshot,
};
pub use server::{DEFAULT_PROXY_PORT, router, serve};
