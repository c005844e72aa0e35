//! Tracing setup
//!
//! Logs go to stdout and, when enabled, to a plain-text log file. The level
//! filter sits behind a reload handle so a configuration update can change it
//! without restarting the service.

use crate::config::ServerSettings;
use crate::error::{Result, ServiceError};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Keeps the file writer alive and exposes level changes
pub struct LoggingRuntime {
    _guard: Option<WorkerGuard>,
    /// Log file in use, if file logging is enabled
    pub log_file: Option<PathBuf>,
    pub level: LogLevelHandle,
}

/// Handle for changing the active log level at runtime
#[derive(Clone)]
pub struct LogLevelHandle {
    inner: reload::Handle<EnvFilter, Registry>,
}

impl LogLevelHandle {
    /// Switch to a configuration-style level name (`DEBUG`, `INFO`, ...)
    pub fn set_level(&self, level: &str) -> Result<()> {
        let directive = level_directive(level);
        self.inner
            .reload(EnvFilter::new(directive))
            .map_err(|e| ServiceError::Logging(e.to_string()))?;
        tracing::info!("Log level set to {}", directive);
        Ok(())
    }
}

/// Map a configuration level name onto a tracing filter directive.
///
/// Unknown names fall back to `info`.
pub fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level; `debug` forces debug output.
pub fn init_logging(settings: &ServerSettings, debug: bool) -> Result<LoggingRuntime> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_directive(&settings.log_level)))
    };
    let (filter, reload_handle) = reload::Layer::new(filter);

    let (file_layer, guard, log_file) = if settings.log_to_file {
        let (writer, guard) = create_file_writer(&settings.log_file)?;
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard), Some(settings.log_file.clone()))
    } else {
        (None, None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| ServiceError::Logging(e.to_string()))?;

    Ok(LoggingRuntime {
        _guard: guard,
        log_file,
        level: LogLevelHandle {
            inner: reload_handle,
        },
    })
}

fn create_file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ServiceError::Logging(format!("invalid log file: {}", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
