//! Shell completion generation.

use clap::{CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Write completions for the given shell to stdout.
pub fn generate_completions<C: CommandFactory>(shell: CompletionShell, bin_name: &str) {
    let mut cmd = C::command();
    let shell_type: Shell = shell.into();
    generate(shell_type, &mut cmd, bin_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_mapping() {
        assert_eq!(Shell::from(CompletionShell::Bash), Shell::Bash);
        assert_eq!(Shell::from(CompletionShell::Zsh), Shell::Zsh);
    }
}
