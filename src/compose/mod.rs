//! Pangolin deployment files
//!
//! Round-trip editing of the compose manifest and the Pangolin config file,
//! limited to the gerbil port fields.

pub mod app_config;
pub mod document;
pub mod manifest;

pub use app_config::AppConfigEditor;
pub use manifest::ManifestEditor;
