//! Pangolin Restart Service
//!
//! This is the main CLI entry point.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pangolin_restart::command::ShellCommandRunner;
use pangolin_restart::config::{validate_file, ConfigHandle, ServiceConfig, DEFAULT_CONFIG_FILE};
use pangolin_restart::container::ContainerController;
use pangolin_restart::daemon::{ApiState, RestartDaemon};
use pangolin_restart::logging::{init_logging, LoggingRuntime};
use pangolin_restart::restart::RestartOrchestrator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Pangolin restart service with gerbil port rotation
#[derive(Parser)]
#[command(name = "pangolin-restart")]
#[command(version)]
#[command(about = "Restart Pangolin on demand with a randomized gerbil port", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve {
        /// Service configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Check a service configuration file and exit
    Validate {
        /// Service configuration file
        config: PathBuf,
    },

    /// Run one restart sequence without starting the HTTP API
    Restart {
        /// Service configuration file
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => serve(Path::new(DEFAULT_CONFIG_FILE), cli.debug).await,
        Some(Commands::Serve { config }) => serve(&config, cli.debug).await,
        Some(Commands::Validate { config }) => validate(&config),
        Some(Commands::Restart { config }) => restart_once(&config, cli.debug).await,
    }
}

/// Load configuration, set up logging and run the startup checks
fn bootstrap(path: &Path, debug: bool) -> Result<(ServiceConfig, LoggingRuntime)> {
    let config = ServiceConfig::load_or_default(path).context("failed to load configuration")?;
    let logging = init_logging(&config.service, debug).context("failed to initialize logging")?;

    if let Err(e) = config.check() {
        error!("{}", e);
        return Err(e).context("startup checks failed");
    }

    Ok((config, logging))
}

fn build_orchestrator(config: ServiceConfig, path: &Path) -> Arc<RestartOrchestrator> {
    let handle = ConfigHandle::new(config, path);
    let controller = ContainerController::new(Arc::new(ShellCommandRunner::new()));
    Arc::new(RestartOrchestrator::new(handle, controller))
}

async fn serve(path: &Path, debug: bool) -> Result<()> {
    let (config, logging) = bootstrap(path, debug)?;

    info!("Starting Pangolin Restart Service...");
    info!(
        "Listening on {}:{}",
        config.service.listen_host, config.service.listen_port
    );
    info!(
        "Port range: {}-{}",
        config.port_range.min, config.port_range.max
    );
    info!("Pangolin directory: {}", config.pangolin.directory.display());
    info!("Docker sudo: {}", config.docker.use_sudo);

    let host = config.service.listen_host.clone();
    let port = config.service.listen_port;
    let orchestrator = build_orchestrator(config, path);
    let state = ApiState::new(orchestrator, Some(logging.level.clone()));

    RestartDaemon::new(state)
        .run(&host, port)
        .await
        .context("HTTP server failed")?;

    info!("Pangolin Restart Service stopped");
    Ok(())
}

async fn restart_once(path: &Path, debug: bool) -> Result<()> {
    let (config, _logging) = bootstrap(path, debug)?;
    let orchestrator = build_orchestrator(config, path);

    let outcome = orchestrator.restart_current().await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.success {
        bail!("{}", outcome.message);
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    println!("Validating configuration file: {}", path.display());

    let report = validate_file(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))?;

    if !report.errors.is_empty() {
        println!("Configuration validation failed:");
        for e in &report.errors {
            println!("  - {}", e);
        }
    }
    if !report.warnings.is_empty() {
        println!("Configuration warnings:");
        for w in &report.warnings {
            println!("  - {}", w);
        }
    }

    if !report.is_valid() {
        bail!("{} configuration error(s)", report.errors.len());
    }

    if report.warnings.is_empty() {
        println!("Configuration is valid");
    } else {
        println!("Configuration is valid (with warnings)");
    }
    Ok(())
}
