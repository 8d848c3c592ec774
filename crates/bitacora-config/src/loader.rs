//! Loading `BitacoraConfig` from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bitacora_contracts::{
    error::{BitacoraError, BitacoraResult},
    validation::PayloadSchema,
};
use bitacora_schema::presets::{site_log_schema, SITE_LOG_SCHEMA_ID};

use crate::settings::{LoggingSettings, StoreSettings, ValidationSettings};

/// Default configuration file name looked up by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "bitacora.toml";

/// The top-level structure deserialized from `bitacora.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BitacoraConfig {
    pub store: StoreSettings,
    pub logging: LoggingSettings,
    pub validation: ValidationSettings,
}

impl BitacoraConfig {
    /// Parse `s` as TOML.
    ///
    /// Relative paths are left as written; `from_file` resolves them.
    /// Returns `ConfigError` if the TOML is malformed or has unknown keys.
    pub fn from_toml_str(s: &str) -> BitacoraResult<Self> {
        toml::from_str(s).map_err(|e| BitacoraError::ConfigError {
            reason: format!("failed to parse configuration TOML: {}", e),
        })
    }

    /// Read and parse the file at `path`, resolving relative paths in it
    /// against the file's directory.
    pub fn from_file(path: &Path) -> BitacoraResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| BitacoraError::ConfigError {
            reason: format!("failed to read configuration file '{}': {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.store.directory = resolve(base, &config.store.directory);
        config.validation.json_schema_file = config
            .validation
            .json_schema_file
            .as_deref()
            .map(|p| resolve(base, p));

        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> BitacoraResult<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            debug!(path = %path.display(), "no configuration file; using defaults");
            Ok(Self::default())
        }
    }

    /// The payload schema new entries must satisfy, or `None` when
    /// validation is disabled.
    ///
    /// Returns `ConfigError` if the JSON Schema file cannot be read or is
    /// not JSON.
    pub fn payload_schema(&self) -> BitacoraResult<Option<PayloadSchema>> {
        let settings = &self.validation;
        if !settings.enabled {
            return Ok(None);
        }
        if !settings.is_custom() {
            let mut schema = site_log_schema();
            if let Some(id) = &settings.schema_id {
                schema.schema_id = id.clone();
            }
            return Ok(Some(schema));
        }

        let json_schema = match &settings.json_schema_file {
            Some(path) => read_json(path)?,
            None => serde_json::Value::Null,
        };
        Ok(Some(PayloadSchema {
            schema_id: settings
                .schema_id
                .clone()
                .unwrap_or_else(|| format!("{SITE_LOG_SCHEMA_ID}-custom")),
            json_schema,
            rules: settings.rules.clone(),
        }))
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn read_json(path: &Path) -> BitacoraResult<serde_json::Value> {
    let contents = std::fs::read_to_string(path).map_err(|e| BitacoraError::ConfigError {
        reason: format!("failed to read JSON Schema file '{}': {}", path.display(), e),
    })?;
    serde_json::from_str(&contents).map_err(|e| BitacoraError::ConfigError {
        reason: format!("JSON Schema file '{}' is not valid JSON: {}", path.display(), e),
    })
}
