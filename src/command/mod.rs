//! External command execution

pub mod runner;

pub use runner::{CommandRunner, ProcessResult, ShellCommandRunner, TIMEOUT_MARKER};
