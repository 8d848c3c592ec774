//! Configuration schema.
//!
//! Deserialized from TOML. Every section and field has a default, so an
//! empty document is a valid configuration.
//!
//! Example:
//! ```toml
//! [store]
//! kind = "file"
//! directory = "bitacora-data"
//!
//! [logging]
//! level = "info"
//!
//! [validation]
//! enabled = true
//! json_schema_file = "schemas/obra.json"
//!
//! [[validation.rules]]
//! rule_id = "no-placeholder"
//! description = "Descriptions must be final text"
//! rule_type = { kind = "forbidden_pattern", field_path = "description", pattern = "TODO" }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use bitacora_contracts::validation::ValidationRule;

/// Which `ChainStore` implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub kind: StoreKind,
    /// Root directory of the file store. Relative paths are resolved
    /// against the directory of the configuration file.
    pub directory: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            directory: PathBuf::from("bitacora-data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Payload validation settings.
///
/// With neither `json_schema_file` nor `rules` set, the built-in site log
/// schema is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub enabled: bool,
    pub schema_id: Option<String>,
    /// JSON Schema document for structural validation. Relative paths are
    /// resolved against the directory of the configuration file.
    pub json_schema_file: Option<PathBuf>,
    pub rules: Vec<ValidationRule>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            schema_id: None,
            json_schema_file: None,
            rules: Vec::new(),
        }
    }
}

impl ValidationSettings {
    pub fn is_custom(&self) -> bool {
        self.json_schema_file.is_some() || !self.rules.is_empty()
    }
}
