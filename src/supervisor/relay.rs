use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;

use super::descriptor::DaemonDescriptor;

/// Width of the name column: longest daemon name in the group, so labels
/// line up across the whole run.
pub(crate) fn label_width(descriptors: &[DaemonDescriptor]) -> usize {
    descriptors.iter().map(|d| d.name.len()).max().unwrap_or(0)
}

/// Spawn background tasks relaying a child's stdout/stderr as labeled lines.
///
/// One task per captured stream, so a stalled daemon never blocks relay for
/// the others. Each task runs until its pipe reaches EOF; the returned
/// handles let the supervisor drain buffered output before reporting.
pub(crate) fn spawn_relays(name: &str, width: usize, child: &mut Child) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(2);

    if let Some(stdout) = child.stdout.take() {
        let name = name.to_string();
        handles.push(tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{name:>width$} | {line}");
            }
        }));
    }
    if let Some(stderr) = child.stderr.take() {
        let name = name.to_string();
        handles.push(tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{name:>width$} | {line}");
            }
        }));
    }

    handles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_width_is_longest_name() {
        let descriptors = vec![
            DaemonDescriptor::new("web", ["true"]),
            DaemonDescriptor::new("scheduler", ["true"]),
        ];
        assert_eq!(label_width(&descriptors), "scheduler".len());
    }

    #[test]
    fn label_width_of_empty_group_is_zero() {
        assert_eq!(label_width(&[]), 0);
    }
}
