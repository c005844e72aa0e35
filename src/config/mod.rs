//! Service configuration
//!
//! Loading, persisting and validating the JSON configuration file, and the
//! shared handle through which running components read it.

pub mod handle;
pub mod service;
pub mod validate;

pub use handle::ConfigHandle;
pub use service::{
    DockerSettings, PangolinSettings, PortRange, RestartConfig, ServerSettings, ServiceConfig,
    DEFAULT_CONFIG_FILE,
};
pub use validate::{validate_file, ValidationReport};
