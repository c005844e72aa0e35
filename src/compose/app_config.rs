//! Gerbil start port in the Pangolin config file

use super::document;
use super::manifest::GERBIL_SERVICE;
use crate::error::EditError;
use serde_yaml::Value;
use std::path::Path;

/// Key under `gerbil` holding the port gerbil listens on
pub const START_PORT_KEY: &str = "start_port";

/// Editor for `config/config.yml`
pub struct AppConfigEditor;

impl AppConfigEditor {
    /// Set `gerbil.start_port` to `port`, keeping every other field as it was.
    ///
    /// Fails with [`EditError::NotFound`] without writing if there is no
    /// `gerbil` section.
    pub fn set_gerbil_start_port(path: &Path, port: u16) -> Result<(), EditError> {
        let result = Self::apply(path, port);
        match &result {
            Ok(()) => tracing::info!("Successfully updated config.yml with port {}", port),
            Err(EditError::NotFound(section)) => {
                tracing::error!("{} section not found in config.yml", section)
            }
            Err(e) => tracing::error!("Failed to update config.yml: {}", e),
        }
        result
    }

    fn apply(path: &Path, port: u16) -> Result<(), EditError> {
        let mut config = document::load(path)?;
        Self::update_document(&mut config, port)?;
        document::store(path, &config)
    }

    /// Set the start port of an in-memory config document
    pub fn update_document(config: &mut Value, port: u16) -> Result<(), EditError> {
        let gerbil = config
            .get_mut(GERBIL_SERVICE)
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| EditError::NotFound(GERBIL_SERVICE.to_string()))?;

        gerbil.insert(Value::from(START_PORT_KEY), Value::from(port));
        tracing::info!("Updated gerbil {} to: {}", START_PORT_KEY, port);
        Ok(())
    }
}
