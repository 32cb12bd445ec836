use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, info};

use crate::environ;
use crate::error::{LaunchError, Result};
use crate::runner;
use crate::stack::{self, ServerConfig, StackConfig, TaskMode};
use crate::supervisor::{DaemonDescriptor, Supervisor};

/// Name of the primary server daemon; always present, always last.
pub const SERVER_DAEMON: &str = "server";

/// Env overrides through which the bind address and reload mode reach the
/// primary server.
pub const SERVER_HOST_VAR: &str = "DEVSTACK_SERVER_HOST";
pub const SERVER_PORT_VAR: &str = "DEVSTACK_SERVER_PORT";
pub const AUTORELOAD_VAR: &str = "DEVSTACK_AUTORELOAD";

/// Resolved command-line options for one launch.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Restart the primary server when source files change.
    pub reload: bool,
    /// Run the configured file watchers.
    pub watchers: bool,
    /// Run background workers and the scheduler.
    pub workers: bool,
    /// Address the primary server binds to.
    pub bind: BindAddress,
}

/// `host[:port]` bind address; absence of `:` means host-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAddress {
    pub host: String,
    pub port: Option<u16>,
}

impl Default for BindAddress {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: Some(8000),
        }
    }
}

impl FromStr for BindAddress {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| LaunchError::InvalidBind {
                    addr: s.to_string(),
                    reason: format!("bad port: {e}"),
                })?;
                Ok(Self {
                    host: host.to_string(),
                    port: Some(port),
                })
            }
            None => Ok(Self {
                host: s.to_string(),
                port: None,
            }),
        }
    }
}

impl std::fmt::Display for BindAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

/// How this launch will run: one foreground daemon, or a supervised group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    Foreground(DaemonDescriptor),
    Group(Vec<DaemonDescriptor>),
}

/// Assemble the daemon set for the given options and stack.
///
/// Pure function of its inputs: watchers first, then workers, then the
/// primary server last, so support daemons appear first in the log. Fails
/// before anything can spawn when the requested set conflicts with the
/// stack configuration.
pub fn assemble(options: &LaunchOptions, config: &StackConfig) -> Result<LaunchPlan> {
    if options.workers && config.task_mode == TaskMode::Inline {
        return Err(LaunchError::ConfigurationConflict(
            "background workers require queued task execution; set task_mode = \"queued\" in devstack.toml".to_string(),
        ));
    }

    let mut daemons: Vec<DaemonDescriptor> = Vec::new();

    if options.watchers {
        for watcher in &config.watchers {
            daemons.push(DaemonDescriptor::new(&watcher.name, watcher.command.clone()));
        }
    }

    if options.workers {
        if config.workers.is_empty() {
            return Err(LaunchError::Config(
                "background workers requested but no [[workers]] are configured".to_string(),
            ));
        }
        for worker in &config.workers {
            daemons.push(DaemonDescriptor::new(&worker.name, worker.command.clone()));
        }
    }

    let server = server_descriptor(&config.server, &options.bind, options.reload);

    // Nothing besides the server: skip the supervisor entirely.
    if daemons.is_empty() {
        return Ok(LaunchPlan::Foreground(server));
    }

    daemons.push(server);
    Ok(LaunchPlan::Group(daemons))
}

fn server_descriptor(
    server: &ServerConfig,
    bind: &BindAddress,
    reload: bool,
) -> DaemonDescriptor {
    let mut descriptor = DaemonDescriptor::new(SERVER_DAEMON, server.command.clone());
    for (key, value) in &server.env {
        descriptor = descriptor.env(key, value);
    }
    descriptor = descriptor.env(SERVER_HOST_VAR, &bind.host);
    if let Some(port) = bind.port {
        descriptor = descriptor.env(SERVER_PORT_VAR, port.to_string());
    }
    if reload {
        descriptor = descriptor.env(AUTORELOAD_VAR, "1");
    }
    descriptor
}

/// Load the stack, assemble the plan, and drive it to completion.
///
/// Returns the exit code to hand back to the invoking shell.
pub async fn launch(options: LaunchOptions, config_override: Option<PathBuf>) -> Result<i32> {
    let path = stack::config_path(config_override);
    let config = StackConfig::load(&path)?;
    let plan = assemble(&options, &config)?;

    info!(bind = %options.bind, "Launching development stack");

    match plan {
        LaunchPlan::Foreground(descriptor) => {
            let base_env = environ::prepare();
            runner::run(&descriptor, &base_env).await
        }
        LaunchPlan::Group(descriptors) => {
            // One-time, before any spawn; children inherit the cwd only at
            // spawn time.
            if let Some(root) = &config.root {
                std::env::set_current_dir(root)?;
                debug!(root = %root.display(), "Changed working directory for the group");
            }
            let base_env = environ::prepare();
            let mut supervisor = Supervisor::new(base_env, config.grace_period());
            supervisor.run(descriptors).await
        }
    }
}
