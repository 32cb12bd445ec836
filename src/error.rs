use thiserror::Error;

/// Exit code for a configuration conflict detected before any daemon has
/// been spawned (EX_CONFIG from sysexits).
pub const CONFIGURATION_CONFLICT_EXIT: i32 = 78;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("configuration conflict: {0}")]
    ConfigurationConflict(String),

    #[error("failed to spawn daemon '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate daemon name '{0}'")]
    DuplicateDaemon(String),

    #[error("invalid bind address '{addr}': {reason}")]
    InvalidBind { addr: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LaunchError>;
