/// Immutable specification of one daemon in the supervised group.
///
/// A descriptor carries everything needed to spawn the daemon: its unique
/// name (used to label relayed output), the argv to execute, and the env
/// vars layered over the shared base environment for this daemon only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonDescriptor {
    /// Daemon name, unique within a run (e.g. "server", "worker").
    pub name: String,
    /// Command to execute as an argv, program first.
    pub command: Vec<String>,
    /// Per-daemon environment overrides, applied over the base environment.
    pub env: Vec<(String, String)>,
}

impl DaemonDescriptor {
    /// Create a descriptor for `name` running `command`.
    pub fn new<I, S>(name: impl Into<String>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            command: command.into_iter().map(|s| s.into()).collect(),
            env: Vec::new(),
        }
    }

    /// Add an environment override for this daemon.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The program to execute, if the command is non-empty.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Arguments passed to the program.
    pub fn args(&self) -> &[String] {
        if self.command.is_empty() {
            &[]
        } else {
            &self.command[1..]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let descriptor = DaemonDescriptor::new("worker", ["taskq", "worker", "-c", "1"])
            .env("LOG_LEVEL", "info");

        assert_eq!(descriptor.name, "worker");
        assert_eq!(descriptor.program(), Some("taskq"));
        assert_eq!(descriptor.args(), ["worker", "-c", "1"]);
        assert!(descriptor
            .env
            .iter()
            .any(|(k, v)| k == "LOG_LEVEL" && v == "info"));
    }

    #[test]
    fn test_empty_command() {
        let descriptor = DaemonDescriptor::new("broken", Vec::<String>::new());
        assert_eq!(descriptor.program(), None);
        assert!(descriptor.args().is_empty());
    }
}
