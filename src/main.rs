mod args;

use args::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use devstack::error::{LaunchError, CONFIGURATION_CONFLICT_EXIT};
use devstack::{completions, environ, launch};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_env(environ::LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        completions::generate_completions::<Cli>(shell, "devstack");
        return;
    }

    let code = match launch::launch(cli.options(), cli.config_path()).await {
        Ok(code) => code,
        Err(e @ LaunchError::ConfigurationConflict(_)) => {
            eprintln!("devstack: {e}");
            CONFIGURATION_CONFLICT_EXIT
        }
        Err(e) => {
            tracing::error!("{e}");
            1
        }
    };

    std::process::exit(code);
}
