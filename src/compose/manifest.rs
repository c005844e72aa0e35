//! Gerbil port rewriting in the compose manifest

use super::document;
use crate::error::EditError;
use serde_yaml::Value;
use std::path::Path;

/// Compose service whose published ports are rotated
pub const GERBIL_SERVICE: &str = "gerbil";

/// TCP mapping the gerbil service ships with.
///
/// Only TCP entries starting with this literal are rewritten; other TCP
/// mappings are deliberately left alone.
pub const TCP_ANCHOR: &str = "443:443";

/// Substring marking a UDP port mapping
pub const UDP_MARKER: &str = "/udp";

/// Editor for the gerbil service's `ports` list in `docker-compose.yml`
pub struct ManifestEditor;

impl ManifestEditor {
    /// Point every recognised gerbil port mapping at `port`.
    ///
    /// The file is only written once the whole document has been loaded and
    /// updated; a missing `services.gerbil.ports` leaves it untouched.
    pub fn set_gerbil_port(path: &Path, port: u16) -> Result<(), EditError> {
        let result = Self::apply(path, port);
        match &result {
            Ok(()) => tracing::info!("Successfully updated docker-compose.yml with port {}", port),
            Err(e) => tracing::error!("Failed to update docker-compose.yml: {}", e),
        }
        result
    }

    fn apply(path: &Path, port: u16) -> Result<(), EditError> {
        let mut manifest = document::load(path)?;
        Self::update_document(&mut manifest, port)?;
        document::store(path, &manifest)
    }

    /// Rewrite the gerbil port mappings of an in-memory manifest
    pub fn update_document(manifest: &mut Value, port: u16) -> Result<(), EditError> {
        let gerbil = manifest
            .get_mut("services")
            .ok_or_else(|| EditError::NotFound("services".to_string()))?
            .get_mut(GERBIL_SERVICE)
            .ok_or_else(|| EditError::NotFound(format!("services.{}", GERBIL_SERVICE)))?;

        let ports = gerbil
            .get_mut("ports")
            .and_then(Value::as_sequence_mut)
            .ok_or_else(|| EditError::NotFound(format!("services.{}.ports", GERBIL_SERVICE)))?;

        for entry in ports.iter_mut() {
            // Long-syntax (mapping) entries are not ours to touch
            let Some(mapping) = entry.as_str() else {
                continue;
            };
            if let Some(updated) = rewrite_mapping(mapping, port) {
                tracing::info!("Updated port mapping {} to: {}", mapping, updated);
                *entry = Value::String(updated);
            }
        }

        Ok(())
    }
}

/// New value for one `ports` entry, or `None` if it must be left unchanged
pub fn rewrite_mapping(mapping: &str, port: u16) -> Option<String> {
    if mapping.contains(UDP_MARKER) {
        Some(format!("{}:{}/udp", port, port))
    } else if mapping.starts_with(TCP_ANCHOR) {
        Some(format!("{}:{}", port, port))
    } else {
        None
    }
}
