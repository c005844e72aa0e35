//! Service configuration file

use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default service configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "service_config.json";

/// Top-level service configuration, persisted as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listener and logging settings
    pub service: ServerSettings,
    /// Location of the managed Pangolin deployment
    pub pangolin: PangolinSettings,
    /// Range the gerbil port is drawn from
    pub port_range: PortRange,
    /// How the compose tool is invoked
    pub docker: DockerSettings,
}

/// HTTP listener and logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_host: String,
    pub listen_port: u16,
    /// One of DEBUG, INFO, WARNING, ERROR
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 8080,
            log_level: "INFO".to_string(),
            log_to_file: true,
            log_file: PathBuf::from("pangolin_restart_service.log"),
        }
    }
}

/// Pangolin deployment layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PangolinSettings {
    /// Directory holding the compose project
    pub directory: PathBuf,
    /// Compose manifest, relative to `directory`
    pub docker_compose_file: PathBuf,
    /// Pangolin config file, relative to `directory`
    pub config_file: PathBuf,
}

impl Default for PangolinSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./pangolin"),
            docker_compose_file: PathBuf::from("docker-compose.yml"),
            config_file: PathBuf::from("config/config.yml"),
        }
    }
}

/// Inclusive port range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            min: 50000,
            max: 60000,
        }
    }
}

impl PortRange {
    /// Check that the range is non-empty and excludes port 0
    pub fn check(&self) -> Result<()> {
        if self.min == 0 {
            return Err(ServiceError::Configuration(
                "port range min must be at least 1".to_string(),
            ));
        }
        if self.min >= self.max {
            return Err(ServiceError::Configuration(format!(
                "port range min ({}) must be less than max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Compose tool invocation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerSettings {
    /// Prefix compose commands with `sudo`
    pub use_sudo: bool,
    /// Per-command timeout in seconds
    pub timeout: u64,
    /// Compose executable and subcommand prefix
    pub compose_command: String,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            use_sudo: true,
            timeout: 120,
            compose_command: "docker compose".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `path`.
    ///
    /// A missing file is created with the defaults; failing to write it is
    /// not fatal. An existing file that cannot be read or parsed is a
    /// configuration error. Logging is not set up yet, so progress is
    /// reported on stderr.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => eprintln!("Created default configuration file: {}", path.display()),
                Err(e) => eprintln!("Failed to create config file {}: {}", path.display(), e),
            }
            return Ok(config);
        }

        let config = Self::load(path).map_err(|e| {
            ServiceError::Configuration(format!(
                "Failed to load config file {}: {}",
                path.display(),
                e
            ))
        })?;
        eprintln!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from `path`, failing on any error
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write configuration to `path` as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Deep-merge a JSON patch into this configuration, producing a new one.
    ///
    /// Objects merge key by key; any other value replaces the current one.
    pub fn merged(&self, patch: Value) -> Result<Self> {
        let mut current = serde_json::to_value(self)?;
        deep_merge(&mut current, patch);
        Ok(serde_json::from_value(current)?)
    }

    /// Startup checks that must pass before the service accepts requests
    pub fn check(&self) -> Result<()> {
        if !self.pangolin.directory.exists() {
            return Err(ServiceError::Configuration(format!(
                "Pangolin directory not found: {}",
                self.pangolin.directory.display()
            )));
        }
        self.check_settings()
    }

    /// Checks on values alone, without touching the filesystem
    pub fn check_settings(&self) -> Result<()> {
        if self.docker.timeout == 0 {
            return Err(ServiceError::Configuration(
                "docker timeout must be at least 1 second".to_string(),
            ));
        }
        self.port_range.check()
    }

    /// Build the restart parameters from the current settings
    pub fn restart_config(&self) -> RestartConfig {
        RestartConfig {
            pangolin_directory: self.pangolin.directory.clone(),
            manifest_file: self.pangolin.docker_compose_file.clone(),
            app_config_file: self.pangolin.config_file.clone(),
            port_min: self.port_range.min,
            port_max: self.port_range.max,
            use_sudo: self.docker.use_sudo,
            command_timeout_secs: self.docker.timeout,
            compose_command: self.docker.compose_command.clone(),
        }
    }
}

/// Recursively merge `source` into `target`
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                let nested = value.is_object() && target.get(&key).is_some_and(Value::is_object);
                if !nested {
                    target.insert(key, value);
                } else if let Some(existing) = target.get_mut(&key) {
                    deep_merge(existing, value);
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Parameters consumed by one restart attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartConfig {
    pub pangolin_directory: PathBuf,
    pub manifest_file: PathBuf,
    pub app_config_file: PathBuf,
    pub port_min: u16,
    pub port_max: u16,
    pub use_sudo: bool,
    pub command_timeout_secs: u64,
    pub compose_command: String,
}

impl RestartConfig {
    /// Absolute (or cwd-relative) path of the compose manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.pangolin_directory.join(&self.manifest_file)
    }

    /// Absolute (or cwd-relative) path of the Pangolin config file
    pub fn app_config_path(&self) -> PathBuf {
        self.pangolin_directory.join(&self.app_config_file)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
