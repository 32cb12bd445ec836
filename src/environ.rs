use std::collections::BTreeMap;
use std::path::PathBuf;

/// Env var naming an alternate stack configuration file.
pub const CONFIG_ENV: &str = "DEVSTACK_CONFIG";

/// Env var controlling the launcher's own log filter.
pub const LOG_ENV: &str = "DEVSTACK_LOG";

/// Set in every daemon's environment so interleaved output from the group
/// stays line-ordered instead of arriving in large flushed blocks.
pub const UNBUFFERED_VAR: &str = "PYTHONUNBUFFERED";
pub const UNBUFFERED_VALUE: &str = "true";

/// Optional value of an env var ($NAME)
pub fn env_opt(name: &str) -> Option<String> {
    let val = std::env::var(name).ok();
    tracing::trace!(name = %name, value = ?val, "Read env var");
    val
}

/// Value of an env var or a default ($NAME or fallback)
pub fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

/// Stack configuration path override ($DEVSTACK_CONFIG)
pub fn config_path_override() -> Option<PathBuf> {
    env_opt(CONFIG_ENV).map(PathBuf::from)
}

/// Build the base environment shared by every daemon in the group: a
/// snapshot of the ambient process environment plus the fixed overrides.
///
/// The snapshot is taken once per launch and handed read-only to each
/// spawn call; the caller's own environment is never touched.
pub fn prepare() -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = std::env::vars().collect();
    env.insert(UNBUFFERED_VAR.to_string(), UNBUFFERED_VALUE.to_string());
    tracing::debug!(vars = env.len(), "Prepared shared daemon environment");
    env
}
