use std::collections::BTreeMap;

use tokio::process::Command;
use tracing::info;

use crate::error::{LaunchError, Result};
use crate::supervisor::{DaemonDescriptor, ExitRecord};

/// Run a single daemon in the foreground of the calling process.
///
/// Degenerate path for a one-member stack: stdio is inherited directly
/// (no relay, no labeling) and the daemon's exit code is returned
/// unchanged. Signal deaths map to `128 + signal` like everywhere else.
pub async fn run(
    descriptor: &DaemonDescriptor,
    base_env: &BTreeMap<String, String>,
) -> Result<i32> {
    let program = descriptor.program().ok_or_else(|| LaunchError::Spawn {
        name: descriptor.name.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;

    info!(name = %descriptor.name, "Running single daemon in the foreground");

    let mut cmd = Command::new(program);
    cmd.args(descriptor.args());
    cmd.env_clear();
    cmd.envs(base_env);
    cmd.envs(descriptor.env.iter().cloned());

    let mut child = cmd.spawn().map_err(|e| LaunchError::Spawn {
        name: descriptor.name.clone(),
        source: e,
    })?;

    let status = child.wait().await?;
    Ok(ExitRecord::from_status(&descriptor.name, status).exit_code)
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::environ;

    #[tokio::test]
    async fn returns_exit_code_unchanged() {
        let descriptor = DaemonDescriptor::new("server", ["/bin/sh", "-c", "exit 7"]);
        let code = run(&descriptor, &environ::prepare()).await.unwrap();
        assert_eq!(code, 7);
    }

    #[tokio::test]
    async fn success_is_zero() {
        let descriptor = DaemonDescriptor::new("server", ["/bin/sh", "-c", "exit 0"]);
        let code = run(&descriptor, &environ::prepare()).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_failure() {
        let descriptor = DaemonDescriptor::new("server", ["/nonexistent-devstack-binary"]);
        let err = run(&descriptor, &environ::prepare()).await.unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { ref name, .. } if name == "server"));
    }
}
