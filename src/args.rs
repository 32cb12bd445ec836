use std::path::PathBuf;

use clap::{ArgAction, Parser};

use devstack::completions::CompletionShell;
use devstack::launch::{BindAddress, LaunchOptions};

#[derive(Parser)]
#[command(name = "devstack")]
#[command(version)]
#[command(about = "Starts a supervised group of local development daemons", long_about = None)]
pub(crate) struct Cli {
    /// Restart the primary server when source files change (default)
    #[arg(long, action = ArgAction::SetTrue, overrides_with = "no_reload")]
    reload: bool,
    /// Disable server autoreload
    #[arg(long, action = ArgAction::SetTrue)]
    no_reload: bool,

    /// Run the configured file watchers (default)
    #[arg(long, action = ArgAction::SetTrue, overrides_with = "no_watchers")]
    watchers: bool,
    /// Skip the configured file watchers
    #[arg(long, action = ArgAction::SetTrue)]
    no_watchers: bool,

    /// Run background workers and the scheduler
    #[arg(long, action = ArgAction::SetTrue, overrides_with = "no_workers")]
    workers: bool,
    /// Skip background workers (default)
    #[arg(long, action = ArgAction::SetTrue)]
    no_workers: bool,

    /// Address to bind the primary server to, as host[:port]
    #[arg(value_name = "ADDRESS", default_value = "127.0.0.1:8000")]
    bind: BindAddress,

    /// Path to the stack configuration (default: ./devstack.toml, or $DEVSTACK_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL")]
    pub completions: Option<CompletionShell>,
}

impl Cli {
    /// Resolve the negation pairs into launch options.
    pub fn options(&self) -> LaunchOptions {
        LaunchOptions {
            reload: !self.no_reload,
            watchers: !self.no_watchers,
            workers: self.workers,
            bind: self.bind.clone(),
        }
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_reload_on_watchers_on_workers_off() {
        let cli = Cli::try_parse_from(["devstack"]).unwrap();
        let options = cli.options();

        assert!(options.reload);
        assert!(options.watchers);
        assert!(!options.workers);
        assert_eq!(options.bind, BindAddress::default());
    }

    #[test]
    fn negation_flags_disable() {
        let cli = Cli::try_parse_from(["devstack", "--no-reload", "--no-watchers"]).unwrap();
        let options = cli.options();

        assert!(!options.reload);
        assert!(!options.watchers);
    }

    #[test]
    fn workers_flag_enables_workers() {
        let cli = Cli::try_parse_from(["devstack", "--workers"]).unwrap();
        assert!(cli.options().workers);
    }

    #[test]
    fn later_flag_wins_within_a_pair() {
        let cli = Cli::try_parse_from(["devstack", "--no-reload", "--reload"]).unwrap();
        assert!(cli.options().reload);

        let cli = Cli::try_parse_from(["devstack", "--workers", "--no-workers"]).unwrap();
        assert!(!cli.options().workers);
    }

    #[test]
    fn bind_argument_is_parsed() {
        let cli = Cli::try_parse_from(["devstack", "0.0.0.0:9000"]).unwrap();
        let options = cli.options();

        assert_eq!(options.bind.host, "0.0.0.0");
        assert_eq!(options.bind.port, Some(9000));
    }

    #[test]
    fn host_only_bind_has_no_port() {
        let cli = Cli::try_parse_from(["devstack", "localhost"]).unwrap();
        assert_eq!(cli.options().bind.port, None);
    }

    #[test]
    fn invalid_bind_is_rejected() {
        assert!(Cli::try_parse_from(["devstack", "localhost:http"]).is_err());
    }
}
