//! Shell command execution with a hard timeout

use async_trait::async_trait;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info};

/// Marker placed in `stderr` when a command exceeds its timeout
pub const TIMEOUT_MARKER: &str = "Command timed out";

/// Maximum number of characters of command output written to the log
const LOG_OUTPUT_LIMIT: usize = 2000;

/// Result of running one external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// Launched, finished within the timeout and exited with status 0
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    fn failed(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs shell commands.
///
/// Implementations never return an error: launch failures, non-zero exits and
/// timeouts are all reported through [`ProcessResult`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` through the shell in `working_dir`, waiting at most `timeout`
    async fn run(&self, command: &str, working_dir: &Path, timeout: Duration) -> ProcessResult;
}

/// Production runner: `sh -c <command>` via tokio.
///
/// The child is placed in its own process group so that a timeout can take
/// down everything it spawned, not just the shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandRunner;

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str, working_dir: &Path, timeout: Duration) -> ProcessResult {
        info!("Executing: {}", command);

        let mut shell = std::process::Command::new("sh");
        shell
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        let spawned = tokio::process::Command::from(shell)
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to execute command: {}, Error: {}", command, e);
                return ProcessResult::failed(e.to_string());
            }
        };

        let pid = child.id();
        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe
        let finished = tokio::time::timeout(timeout, async {
            tokio::join!(
                child.wait(),
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stdout_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut h) = stderr_handle {
                        let _ = h.read_to_end(&mut buf).await;
                    }
                    buf
                },
            )
        })
        .await;

        let (status, stdout, stderr) = match finished {
            Ok(output) => output,
            Err(_) => {
                error!("Command timed out: {}", command);
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                let _ = child.kill().await;
                return ProcessResult::failed(TIMEOUT_MARKER);
            }
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                error!("Failed to wait for command: {}, Error: {}", command, e);
                return ProcessResult::failed(e.to_string());
            }
        };

        let result = ProcessResult {
            succeeded: status.success(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };

        if result.succeeded {
            info!("Command succeeded: {}", command);
            let out = result.stdout.trim();
            if !out.is_empty() {
                debug!("Output: {}", truncate(out, LOG_OUTPUT_LIMIT));
            }
        } else {
            error!("Command failed ({}): {}", status, command);
            error!("Error: {}", truncate(result.stderr.trim(), LOG_OUTPUT_LIMIT));
        }

        result
    }
}

/// SIGKILL every process in the group led by `pid`
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg has no memory-safety preconditions; a stale group id only yields ESRCH
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "killpg({}) failed: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

/// Cut `text` to at most `limit` characters, marking the cut
fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}... [truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
