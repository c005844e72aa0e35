//! Offline validation of a service configuration file
//!
//! Works on the raw JSON document rather than [`ServiceConfig`] so that
//! missing sections and wrongly typed values are reported individually
//! instead of as a single deserialization failure.
//!
//! [`ServiceConfig`]: super::ServiceConfig

use crate::error::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Sections every configuration file must carry
pub const REQUIRED_SECTIONS: &[&str] = &["service", "pangolin", "port_range", "docker"];

/// Accepted `service.log_level` values
pub const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR"];

/// Outcome of validating a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make the file unusable
    pub errors: Vec<String>,
    /// Problems the service can start with
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read and validate the configuration file at `path`
pub fn validate_file(path: &Path) -> Result<ValidationReport> {
    let content = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    Ok(validate_value(&document))
}

/// Validate an already parsed configuration document
pub fn validate_value(config: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    for section in REQUIRED_SECTIONS {
        if config.get(section).is_none() {
            report
                .errors
                .push(format!("Missing required section: {}", section));
        }
    }

    if let Some(service) = config.get("service") {
        if let Some(port) = service.get("listen_port") {
            match port.as_u64() {
                Some(p) if (1..=65535).contains(&p) => {}
                _ => report
                    .errors
                    .push(format!("Invalid listen_port: {} (must be 1-65535)", port)),
            }
        }

        if let Some(level) = service.get("log_level") {
            if !level.as_str().is_some_and(|l| LOG_LEVELS.contains(&l)) {
                report.errors.push(format!(
                    "Invalid log_level: {} (must be one of {})",
                    level,
                    LOG_LEVELS.join(", ")
                ));
            }
        }
    }

    if let Some(pangolin) = config.get("pangolin") {
        check_pangolin_paths(pangolin, &mut report);
    }

    if let Some(range) = config.get("port_range") {
        if let (Some(min), Some(max)) = (range.get("min"), range.get("max")) {
            match (min.as_i64(), max.as_i64()) {
                (Some(min), Some(max)) => {
                    if min >= max {
                        report.errors.push(format!(
                            "Port range min ({}) must be less than max ({})",
                            min, max
                        ));
                    }
                    if min < 1 {
                        report
                            .errors
                            .push(format!("Port range min ({}) must be at least 1", min));
                    } else if min < 1024 {
                        report.warnings.push(format!(
                            "Port range min ({}) is below 1024 (privileged ports)",
                            min
                        ));
                    }
                    if max > 65535 {
                        report.errors.push(format!(
                            "Port range max ({}) exceeds maximum port number (65535)",
                            max
                        ));
                    }
                }
                _ => report
                    .errors
                    .push("Port range min and max must be integers".to_string()),
            }
        }
    }

    if let Some(timeout) = config.get("docker").and_then(|d| d.get("timeout")) {
        if !timeout.as_u64().is_some_and(|t| t > 0) {
            report.errors.push(format!(
                "Docker timeout must be a positive integer, got: {}",
                timeout
            ));
        }
    }

    report
}

fn check_pangolin_paths(pangolin: &Value, report: &mut ValidationReport) {
    let Some(directory) = pangolin.get("directory").and_then(Value::as_str) else {
        return;
    };
    let directory = PathBuf::from(directory);
    if !directory.exists() {
        report.warnings.push(format!(
            "Pangolin directory does not exist: {}",
            directory.display()
        ));
        return;
    }

    let files = [
        ("docker_compose_file", "Docker compose file not found"),
        ("config_file", "Pangolin config file not found"),
    ];
    for (key, message) in files {
        if let Some(file) = pangolin.get(key).and_then(Value::as_str) {
            let path = directory.join(file);
            if !path.exists() {
                report
                    .warnings
                    .push(format!("{}: {}", message, path.display()));
            }
        }
    }
}
