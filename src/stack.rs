use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::environ;
use crate::error::{LaunchError, Result};

const DEFAULT_CONFIG_FILE: &str = "devstack.toml";
const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// How the surrounding task-execution system runs background work.
///
/// `Inline` means tasks execute synchronously in the server process, which
/// makes dedicated worker daemons meaningless; requesting them is a
/// configuration conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    #[default]
    Queued,
    Inline,
}

/// One externally supplied daemon: a name and the command to run.
///
/// Opaque to the launcher; only the shape matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonSpec {
    pub name: String,
    pub command: Vec<String>,
}

/// Primary server command and its extra environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Command to execute, program first.
    pub command: Vec<String>,
    /// Extra environment applied to the server daemon only.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Resolved stack definition, normally loaded from `devstack.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    /// Project root to change into before spawning anything.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Task execution mode of the surrounding system.
    #[serde(default)]
    pub task_mode: TaskMode,

    /// Seconds a daemon gets to honor a stop request before being killed.
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    pub server: ServerConfig,

    /// File watchers, started before the server when enabled.
    #[serde(default)]
    pub watchers: Vec<DaemonSpec>,

    /// Background worker and scheduler daemons, started when requested.
    #[serde(default)]
    pub workers: Vec<DaemonSpec>,
}

fn default_grace_period() -> u64 {
    DEFAULT_GRACE_PERIOD_SECS
}

/// Resolve the configuration file path: explicit flag, then
/// $DEVSTACK_CONFIG, then ./devstack.toml, then the user config directory.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Some(path) = environ::config_path_override() {
        return path;
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("devstack")
        .join(DEFAULT_CONFIG_FILE)
}

impl StackConfig {
    pub fn load(path: &Path) -> Result<Self> {
        tracing::trace!(path = %path.display(), "Loading stack configuration");

        let content = fs::read_to_string(path).map_err(|e| {
            LaunchError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            LaunchError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.server.command.is_empty() {
            return Err(LaunchError::Config(
                "[server] command must not be empty".to_string(),
            ));
        }
        for spec in self.watchers.iter().chain(self.workers.iter()) {
            if spec.name.is_empty() {
                return Err(LaunchError::Config(
                    "daemon entries must have a non-empty name".to_string(),
                ));
            }
            if spec.command.is_empty() {
                return Err(LaunchError::Config(format!(
                    "daemon '{}' has an empty command",
                    spec.name
                )));
            }
        }
        Ok(())
    }
}
