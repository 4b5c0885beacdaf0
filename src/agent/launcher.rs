//! Agent launch commands and Python environment discovery.
//!
//! # Environment Managers
//!
//! | Manager | Required field | Command |
//! |---------|----------------|---------|
//! | `conda` | `envName` (must exist) | `conda activate <env> && python main.py` |
//! | `venv` | `venvPath` | `source <venv>/bin/activate && python main.py` |
//! | `poetry` | `poetryPath` | `cd <dir> && poetry run python main.py` |
//! | `pipenv` | `pipenvPath` | `cd <dir> && pipenv run python main.py` |
//! | `uv` | `uvPath` | `cd <dir> && uv run python main.py` |
//! | `manual` | `pythonPath` | `<python> main.py` |

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

use super::decode::decode_output;

/// Default conda environment name.
pub const DEFAULT_CONDA_ENV: &str = "maicraft";

/// Agent entry point run inside the environment.
pub const ENTRY_POINT: &str = "main.py";

// ============================================================================
// Platform
// ============================================================================

/// Host shell flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// Returns the platform this binary runs on.
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }

    /// Returns the shell program and arguments that run `command`.
    #[must_use]
    pub fn shell(&self, command: &str) -> (&'static str, Vec<String>) {
        match self {
            Self::Windows => ("cmd", vec!["/c".to_string(), command.to_string()]),
            Self::Unix => ("bash", vec!["-c".to_string(), command.to_string()]),
        }
    }
}

// ============================================================================
// StartRequest
// ============================================================================

/// Python environment manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvManager {
    #[default]
    Conda,
    Venv,
    Poetry,
    Pipenv,
    Uv,
    Manual,
}

fn default_env_name() -> String {
    DEFAULT_CONDA_ENV.to_string()
}

/// Body of `POST /api/agent/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub env_manager: EnvManager,
    #[serde(default = "default_env_name")]
    pub env_name: String,
    #[serde(default)]
    pub venv_path: Option<String>,
    #[serde(default)]
    pub poetry_path: Option<String>,
    #[serde(default)]
    pub pipenv_path: Option<String>,
    #[serde(default)]
    pub python_path: Option<String>,
    #[serde(default)]
    pub uv_path: Option<String>,
    /// Agent working directory; required.
    #[serde(default)]
    pub work_dir: Option<String>,
}

impl Default for StartRequest {
    fn default() -> Self {
        Self {
            env_manager: EnvManager::default(),
            env_name: default_env_name(),
            venv_path: None,
            poetry_path: None,
            pipenv_path: None,
            python_path: None,
            uv_path: None,
            work_dir: None,
        }
    }
}

impl StartRequest {
    /// Returns the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if it is missing or blank.
    pub fn work_dir(&self) -> Result<PathBuf> {
        match self.work_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => Err(Error::invalid_argument("working directory is required")),
        }
    }
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::invalid_argument(format!("{what} is required"))),
    }
}

/// Builds the shell command for `request`.
///
/// Does not check that a conda environment exists; see
/// [`conda_env_exists`].
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the manager's path is missing.
pub fn start_command(request: &StartRequest, platform: Platform) -> Result<String> {
    let command = match request.env_manager {
        EnvManager::Conda => {
            let env = required(Some(&request.env_name), "conda environment name")?;
            format!("conda activate {env} && python {ENTRY_POINT}")
        }
        EnvManager::Venv => {
            let venv = required(request.venv_path.as_deref(), "virtualenv path")?;
            let activate = match platform {
                Platform::Windows => format!("{venv}\\Scripts\\activate.bat"),
                Platform::Unix => format!("{venv}/bin/activate"),
            };
            format!("source {activate} && python {ENTRY_POINT}")
        }
        EnvManager::Poetry => {
            let dir = required(request.poetry_path.as_deref(), "poetry project path")?;
            format!("cd {dir} && poetry run python {ENTRY_POINT}")
        }
        EnvManager::Pipenv => {
            let dir = required(request.pipenv_path.as_deref(), "pipenv project path")?;
            format!("cd {dir} && pipenv run python {ENTRY_POINT}")
        }
        EnvManager::Uv => {
            let dir = required(request.uv_path.as_deref(), "uv project path")?;
            format!("cd {dir} && uv run python {ENTRY_POINT}")
        }
        EnvManager::Manual => {
            let python = required(request.python_path.as_deref(), "python executable path")?;
            format!("{python} {ENTRY_POINT}")
        }
    };
    Ok(command)
}

// ============================================================================
// Environment Discovery
// ============================================================================

/// One line of `conda env list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondaEnv {
    pub name: String,
    pub path: String,
}

/// Parses `conda env list` output, skipping comments and `base`.
#[must_use]
pub fn parse_conda_envs(stdout: &str) -> Vec<CondaEnv> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            if name == "base" {
                return None;
            }
            Some(CondaEnv {
                name: name.to_string(),
                path: parts.collect::<Vec<_>>().join(" "),
            })
        })
        .collect()
}

/// Tools found on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEnvs {
    /// Conda environment names, without `base`.
    pub conda: Vec<String>,
    /// `python --version` output, or empty.
    pub python: String,
    pub poetry: bool,
    pub pipenv: bool,
    pub uv: bool,
}

/// Runs `program args` and returns its decoded stdout on success.
async fn tool_output(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output().await {
        Ok(output) if output.status.success() => {
            // Older Pythons print the version on stderr.
            let text = if output.stdout.is_empty() {
                decode_output(&output.stderr)
            } else {
                decode_output(&output.stdout)
            };
            Some(text)
        }
        Ok(output) => {
            debug!(program, status = %output.status, "Tool check exited unsuccessfully");
            None
        }
        Err(e) => {
            debug!(program, "Tool check failed to run: {e}");
            None
        }
    }
}

/// Lists conda environments.
///
/// # Errors
///
/// Returns [`Error::Agent`] if `conda env list` cannot run or fails.
pub async fn list_conda_envs() -> Result<Vec<CondaEnv>> {
    let output = Command::new("conda")
        .args(["env", "list"])
        .output()
        .await
        .map_err(|e| Error::agent(format!("failed to list conda environments: {e}")))?;

    if !output.status.success() {
        return Err(Error::agent(format!(
            "failed to list conda environments: {}",
            decode_output(&output.stderr)
        )));
    }
    Ok(parse_conda_envs(&decode_output(&output.stdout)))
}

/// Returns `true` if conda lists an environment named `name`.
pub async fn conda_env_exists(name: &str) -> bool {
    match list_conda_envs().await {
        Ok(envs) => envs.iter().any(|e| e.name == name) || name == "base",
        Err(e) => {
            debug!("Conda check failed: {e}");
            false
        }
    }
}

/// Checks which of conda, python, poetry, pipenv and uv are installed.
pub async fn detect_system_envs() -> SystemEnvs {
    let (conda, python, poetry, pipenv, uv) = tokio::join!(
        tool_output("conda", &["env", "list"]),
        tool_output("python", &["--version"]),
        tool_output("poetry", &["--version"]),
        tool_output("pipenv", &["--version"]),
        tool_output("uv", &["--version"]),
    );

    SystemEnvs {
        conda: conda
            .map(|out| parse_conda_envs(&out).into_iter().map(|e| e.name).collect())
            .unwrap_or_default(),
        python: python.unwrap_or_default(),
        poetry: poetry.is_some(),
        pipenv: pipenv.is_some(),
        uv: uv.is_some(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(manager: EnvManager) -> StartRequest {
        StartRequest {
            env_manager: manager,
            ..StartRequest::default()
        }
    }

    #[test]
    fn test_start_request_defaults() {
        let req: StartRequest = serde_json::from_str(r#"{"workDir":"/srv/agent"}"#).unwrap();
        assert_eq!(req.env_manager, EnvManager::Conda);
        assert_eq!(req.env_name, "maicraft");
        assert_eq!(req.work_dir().unwrap(), PathBuf::from("/srv/agent"));
    }

    #[test]
    fn test_blank_work_dir_rejected() {
        let mut req = StartRequest::default();
        assert!(req.work_dir().is_err());
        req.work_dir = Some("   ".into());
        assert!(matches!(req.work_dir(), Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_commands() {
        let conda = start_command(&request(EnvManager::Conda), Platform::Unix).unwrap();
        assert_eq!(conda, "conda activate maicraft && python main.py");

        let mut venv = request(EnvManager::Venv);
        venv.venv_path = Some("/opt/venv".into());
        assert_eq!(
            start_command(&venv, Platform::Unix).unwrap(),
            "source /opt/venv/bin/activate && python main.py"
        );
        assert_eq!(
            start_command(&venv, Platform::Windows).unwrap(),
            "source /opt/venv\\Scripts\\activate.bat && python main.py"
        );

        let mut uv = request(EnvManager::Uv);
        uv.uv_path = Some("/srv/agent".into());
        assert_eq!(
            start_command(&uv, Platform::Unix).unwrap(),
            "cd /srv/agent && uv run python main.py"
        );

        let mut manual = request(EnvManager::Manual);
        manual.python_path = Some("/usr/bin/python3".into());
        assert_eq!(
            start_command(&manual, Platform::Unix).unwrap(),
            "/usr/bin/python3 main.py"
        );
    }

    #[test]
    fn test_missing_paths() {
        for manager in [
            EnvManager::Venv,
            EnvManager::Poetry,
            EnvManager::Pipenv,
            EnvManager::Uv,
            EnvManager::Manual,
        ] {
            assert!(
                matches!(
                    start_command(&request(manager), Platform::Unix),
                    Err(Error::InvalidArgument { .. })
                ),
                "{manager:?}"
            );
        }
    }

    #[test]
    fn test_unknown_manager_rejected_by_serde() {
        let parsed = serde_json::from_str::<StartRequest>(r#"{"envManager":"nix"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_conda_envs() {
        let out = "# conda environments:\n#\nbase  *  /opt/conda\nmaicraft     /opt/conda/envs/maicraft\n\nml /home/u/my envs/ml\n";
        let envs = parse_conda_envs(out);
        assert_eq!(
            envs,
            vec![
                CondaEnv {
                    name: "maicraft".into(),
                    path: "/opt/conda/envs/maicraft".into()
                },
                CondaEnv {
                    name: "ml".into(),
                    path: "/home/u/my envs/ml".into()
                },
            ]
        );
    }

    #[test]
    fn test_shell() {
        let (program, args) = Platform::Unix.shell("echo hi");
        assert_eq!(program, "bash");
        assert_eq!(args, vec!["-c", "echo hi"]);
    }
}
