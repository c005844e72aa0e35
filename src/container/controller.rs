//! Compose project stop/start

use crate::command::CommandRunner;
use crate::config::RestartConfig;
use std::sync::Arc;

/// Stops and starts the Pangolin compose project.
///
/// The only component that touches live container state.
#[derive(Clone)]
pub struct ContainerController {
    runner: Arc<dyn CommandRunner>,
}

impl ContainerController {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// `compose down`; true if the command succeeded
    pub async fn stop(&self, config: &RestartConfig) -> bool {
        tracing::info!("Stopping Pangolin containers...");
        self.compose(config, "down").await
    }

    /// `compose up -d`; true if the command succeeded
    pub async fn start(&self, config: &RestartConfig) -> bool {
        tracing::info!("Starting Pangolin containers...");
        self.compose(config, "up -d").await
    }

    async fn compose(&self, config: &RestartConfig, subcommand: &str) -> bool {
        let command = compose_command(config, subcommand);
        self.runner
            .run(
                &command,
                &config.pangolin_directory,
                config.command_timeout(),
            )
            .await
            .succeeded
    }
}

/// Full shell command line for a compose subcommand
pub fn compose_command(config: &RestartConfig, subcommand: &str) -> String {
    let sudo = if config.use_sudo { "sudo " } else { "" };
    format!("{}{} {}", sudo, config.compose_command, subcommand)
}
