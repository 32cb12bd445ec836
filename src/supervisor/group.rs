use std::collections::{BTreeMap, HashSet};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use futures::future;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{LaunchError, Result};

use super::descriptor::DaemonDescriptor;
use super::relay;

/// Group-wide lifecycle phase shared by all daemons in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Daemons are being spawned in descriptor order.
    Starting,
    /// All daemons are up; waiting for the first exit.
    Running,
    /// First exit observed (or spawn aborted); stopping the rest.
    ShuttingDown,
    /// Every daemon has produced an exit record.
    Terminated,
}

impl GroupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupState::Starting => "starting",
            GroupState::Running => "running",
            GroupState::ShuttingDown => "shutting-down",
            GroupState::Terminated => "terminated",
        }
    }
}

/// Terminal record for one daemon.
///
/// A signal death is folded into `exit_code` as `128 + signal`, the shell
/// convention, so the aggregate code is always meaningful to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRecord {
    pub name: String,
    pub exit_code: i32,
    pub signaled: bool,
}

impl ExitRecord {
    pub(crate) fn from_status(name: &str, status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self {
                    name: name.to_string(),
                    exit_code: 128 + signal,
                    signaled: true,
                };
            }
        }
        Self {
            name: name.to_string(),
            exit_code: status.code().unwrap_or(1),
            signaled: false,
        }
    }

    fn wait_failed(name: String) -> Self {
        Self {
            name,
            exit_code: 1,
            signaled: false,
        }
    }
}

struct RunningDaemon {
    descriptor: DaemonDescriptor,
    child: Child,
    started_at: Instant,
}

/// Supervisor for a group of development daemons.
///
/// Drives one group from `Starting` to `Terminated`: spawns every
/// descriptor, relays labeled output, races on the first exit, then tears
/// the rest down (SIGTERM, then SIGKILL after the grace period). The
/// aggregate exit code is the first terminator's code.
pub struct Supervisor {
    base_env: BTreeMap<String, String>,
    grace_period: Duration,
    state: GroupState,
    daemons: Vec<RunningDaemon>,
    relays: Vec<JoinHandle<()>>,
    exits: Vec<ExitRecord>,
}

impl Supervisor {
    pub fn new(base_env: BTreeMap<String, String>, grace_period: Duration) -> Self {
        Self {
            base_env,
            grace_period,
            state: GroupState::Starting,
            daemons: Vec::new(),
            relays: Vec::new(),
            exits: Vec::new(),
        }
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    /// Exit records collected so far, first terminator first.
    pub fn exit_records(&self) -> &[ExitRecord] {
        &self.exits
    }

    /// Run the group to termination and return the aggregate exit code.
    ///
    /// A spawn failure aborts the remaining spawns, tears down anything
    /// already running, and surfaces as an error; once all daemons are up
    /// the only way out is the first-exit teardown.
    pub async fn run(&mut self, descriptors: Vec<DaemonDescriptor>) -> Result<i32> {
        if descriptors.is_empty() {
            return Err(LaunchError::Config("daemon group is empty".to_string()));
        }
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.name.clone()) {
                return Err(LaunchError::DuplicateDaemon(descriptor.name.clone()));
            }
        }

        let width = relay::label_width(&descriptors);
        if let Err(e) = self.spawn_all(&descriptors, width) {
            warn!("Aborting group start: {e}");
            self.transition(GroupState::ShuttingDown);
            self.shutdown_remaining().await;
            self.drain_relays().await;
            self.transition(GroupState::Terminated);
            return Err(e);
        }

        self.transition(GroupState::Running);
        info!(daemons = self.daemons.len(), "Development stack is up");

        let primary = self.wait_first().await;
        info!(
            name = %primary.name,
            code = primary.exit_code,
            signaled = primary.signaled,
            "First daemon exit, shutting down the group"
        );
        self.exits.push(primary.clone());

        self.transition(GroupState::ShuttingDown);
        self.shutdown_remaining().await;
        self.drain_relays().await;
        self.transition(GroupState::Terminated);

        Ok(primary.exit_code)
    }

    fn transition(&mut self, next: GroupState) {
        debug!(old = self.state.as_str(), new = next.as_str(), "Group state change");
        self.state = next;
    }

    fn spawn_all(&mut self, descriptors: &[DaemonDescriptor], width: usize) -> Result<()> {
        for descriptor in descriptors {
            let mut child = self.spawn_one(descriptor)?;
            self.relays
                .extend(relay::spawn_relays(&descriptor.name, width, &mut child));
            self.daemons.push(RunningDaemon {
                descriptor: descriptor.clone(),
                child,
                started_at: Instant::now(),
            });
        }
        Ok(())
    }

    fn spawn_one(&self, descriptor: &DaemonDescriptor) -> Result<Child> {
        let program = descriptor.program().ok_or_else(|| LaunchError::Spawn {
            name: descriptor.name.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(descriptor.args());
        cmd.env_clear();
        cmd.envs(&self.base_env);
        cmd.envs(descriptor.env.iter().cloned());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        match cmd.spawn() {
            Ok(child) => {
                info!(name = %descriptor.name, pid = ?child.id(), "Started daemon");
                Ok(child)
            }
            Err(e) => {
                error!(name = %descriptor.name, "Failed to start daemon: {e}");
                Err(LaunchError::Spawn {
                    name: descriptor.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// Race across all children for the first exit.
    async fn wait_first(&mut self) -> ExitRecord {
        let (status, index) = {
            let waits: Vec<_> = self
                .daemons
                .iter_mut()
                .map(|d| Box::pin(d.child.wait()))
                .collect();
            let (status, index, rest) = future::select_all(waits).await;
            drop(rest);
            (status, index)
        };

        let exited = self.daemons.remove(index);
        let name = exited.descriptor.name;
        debug!(
            name = %name,
            uptime_secs = exited.started_at.elapsed().as_secs(),
            "Daemon exited"
        );
        match status {
            Ok(status) => ExitRecord::from_status(&name, status),
            Err(e) => {
                error!(name = %name, "Failed to collect daemon exit status: {e}");
                ExitRecord::wait_failed(name)
            }
        }
    }

    /// Stop every remaining daemon concurrently and collect its exit record.
    ///
    /// Bounded: a daemon that ignores the stop request is killed once the
    /// grace period elapses.
    async fn shutdown_remaining(&mut self) {
        if self.daemons.is_empty() {
            return;
        }
        info!(
            remaining = self.daemons.len(),
            grace = ?self.grace_period,
            "Stopping remaining daemons"
        );

        let grace = self.grace_period;
        let sweeps = self.daemons.iter_mut().map(|daemon| async move {
            let name = daemon.descriptor.name.clone();
            request_stop(&mut daemon.child, &name);

            match timeout(grace, daemon.child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(name = %name, "Daemon stopped gracefully");
                    ExitRecord::from_status(&name, status)
                }
                Ok(Err(e)) => {
                    error!(name = %name, "Failed to collect daemon exit status: {e}");
                    ExitRecord::wait_failed(name)
                }
                Err(_) => {
                    warn!(name = %name, "Daemon did not stop within the grace period, force killing");
                    if let Err(e) = daemon.child.start_kill() {
                        error!(name = %name, "Failed to kill daemon: {e}");
                    }
                    match daemon.child.wait().await {
                        Ok(status) => ExitRecord::from_status(&name, status),
                        Err(e) => {
                            error!(name = %name, "Failed to collect daemon exit status: {e}");
                            ExitRecord::wait_failed(name)
                        }
                    }
                }
            }
        });

        let records = future::join_all(sweeps).await;
        self.exits.extend(records);
        self.daemons.clear();
    }

    /// Await relay tasks so buffered output is flushed before reporting.
    async fn drain_relays(&mut self) {
        for handle in self.relays.drain(..) {
            let _ = handle.await;
        }
    }
}

/// Ask a daemon to stop; escalation happens after the grace period.
fn request_stop(child: &mut Child, name: &str) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            debug!(name = %name, pid, "Sending SIGTERM");
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
        }
    }
    #[cfg(not(unix))]
    {
        debug!(name = %name, "Requesting stop");
        let _ = child.start_kill();
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::environ;

    fn sh(name: &str, script: &str) -> DaemonDescriptor {
        DaemonDescriptor::new(name, ["/bin/sh", "-c", script])
    }

    fn supervisor() -> Supervisor {
        Supervisor::new(environ::prepare(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn first_exit_tears_down_group() {
        let mut sup = supervisor();
        let code = sup
            .run(vec![
                sh("quitter", "exit 3"),
                sh("stayer", "exec sleep 30"),
            ])
            .await
            .unwrap();

        assert_eq!(code, 3);
        assert_eq!(sup.state(), GroupState::Terminated);
        assert_eq!(sup.exit_records().len(), 2);
        assert_eq!(sup.exit_records()[0].name, "quitter");

        let stayer = &sup.exit_records()[1];
        assert_eq!(stayer.name, "stayer");
        assert!(stayer.signaled);
    }

    #[tokio::test]
    async fn aggregate_code_is_first_terminator_regardless_of_position() {
        let mut sup = supervisor();
        let code = sup
            .run(vec![
                sh("a", "exec sleep 30"),
                sh("b", "exit 3"),
                sh("c", "exec sleep 30"),
            ])
            .await
            .unwrap();

        assert_eq!(code, 3);
        assert_eq!(sup.exit_records().len(), 3);
        assert_eq!(sup.exit_records()[0].name, "b");
    }

    #[tokio::test]
    async fn env_overrides_merge_over_base() {
        let mut sup = supervisor();
        let descriptor =
            sh("probe", "exit \"$DEVSTACK_TEST_CODE\"").env("DEVSTACK_TEST_CODE", "7");
        let code = sup.run(vec![descriptor]).await.unwrap();
        assert_eq!(code, 7);
    }

    #[tokio::test]
    async fn base_env_disables_output_buffering() {
        let mut sup = supervisor();
        let code = sup
            .run(vec![sh("probe", "test \"$PYTHONUNBUFFERED\" = true")])
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn spawn_failure_aborts_group() {
        let mut sup = supervisor();
        let err = sup
            .run(vec![
                sh("stayer", "exec sleep 30"),
                DaemonDescriptor::new("broken", ["/nonexistent-devstack-binary"]),
                sh("never", "exec sleep 30"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::Spawn { ref name, .. } if name == "broken"));
        assert_eq!(sup.state(), GroupState::Terminated);
        // Only the already-spawned daemon produced a record; "never" was not started.
        assert_eq!(sup.exit_records().len(), 1);
        assert_eq!(sup.exit_records()[0].name, "stayer");
    }

    #[tokio::test]
    async fn duplicate_names_refused_before_spawn() {
        let mut sup = supervisor();
        let err = sup
            .run(vec![sh("web", "exec sleep 30"), sh("web", "exec sleep 30")])
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::DuplicateDaemon(ref name) if name == "web"));
        assert_eq!(sup.state(), GroupState::Starting);
        assert!(sup.exit_records().is_empty());
    }

    #[tokio::test]
    async fn stubborn_daemon_is_force_killed() {
        let mut sup = supervisor();
        // Traps SIGTERM, so only the SIGKILL escalation can end it. The
        // quitter lingers long enough for the trap to be installed.
        let code = sup
            .run(vec![
                sh("quitter", "sleep 1; exit 0"),
                sh("stubborn", "trap '' TERM; sleep 5 & wait"),
            ])
            .await
            .unwrap();

        assert_eq!(code, 0);
        let stubborn = &sup.exit_records()[1];
        assert_eq!(stubborn.name, "stubborn");
        assert!(stubborn.signaled);
        assert_eq!(stubborn.exit_code, 128 + libc::SIGKILL);
    }
}
