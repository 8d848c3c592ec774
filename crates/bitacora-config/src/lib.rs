//! # bitacora-config
//!
//! TOML configuration for the bitácora tools: which store to open, the
//! default log filter, and which payload schema new entries must satisfy.
//!
//! ```rust,ignore
//! use std::path::Path;
//! use bitacora_config::BitacoraConfig;
//!
//! let config = BitacoraConfig::load_or_default(Path::new("bitacora.toml"))?;
//! let schema = config.payload_schema()?;
//! ```

pub mod loader;
pub mod settings;

pub use loader::{BitacoraConfig, DEFAULT_CONFIG_FILE};
pub use settings::{LoggingSettings, StoreKind, StoreSettings, ValidationSettings};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use serde_json::json;
    use tempfile::tempdir;

    use bitacora_contracts::{error::BitacoraError, validation::ValidationRuleType};
    use bitacora_schema::presets::SITE_LOG_SCHEMA_ID;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = BitacoraConfig::from_toml_str("").unwrap();

        assert_eq!(config.store.kind, StoreKind::File);
        assert_eq!(config.store.directory, PathBuf::from("bitacora-data"));
        assert_eq!(config.logging.level, "warn");
        assert!(config.validation.enabled);
    }

    #[test]
    fn full_document_parses() {
        let toml = r#"
            [store]
            kind = "memory"

            [logging]
            level = "debug"

            [validation]
            schema_id = "obra-norte"

            [[validation.rules]]
            rule_id = "no-placeholder"
            description = "Descriptions must be final text"
            rule_type = { kind = "forbidden_pattern", field_path = "description", pattern = "TODO" }

            [[validation.rules]]
            rule_id = "known-category"
            rule_type = { kind = "allowed_values", field_path = "category", allowed = ["incident", "safety"] }
        "#;

        let config = BitacoraConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.validation.rules.len(), 2);

        match &config.validation.rules[1].rule_type {
            ValidationRuleType::AllowedValues { field_path, allowed } => {
                assert_eq!(field_path, "category");
                assert_eq!(allowed, &vec![json!("incident"), json!("safety")]);
            }
            other => panic!("expected AllowedValues, got {:?}", other),
        }

        let schema = config.payload_schema().unwrap().unwrap();
        assert_eq!(schema.schema_id, "obra-norte");
        assert!(schema.json_schema.is_null());
        assert_eq!(schema.rules.len(), 2);
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let err = BitacoraConfig::from_toml_str("[store]\nkinds = \"file\"\n").unwrap_err();
        match err {
            BitacoraError::ConfigError { reason } => {
                assert!(reason.contains("failed to parse"), "unexpected reason: {reason}")
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn default_validation_uses_site_log_schema() {
        let schema = BitacoraConfig::default().payload_schema().unwrap().unwrap();
        assert_eq!(schema.schema_id, SITE_LOG_SCHEMA_ID);
        assert!(!schema.json_schema.is_null());
    }

    #[test]
    fn disabled_validation_has_no_schema() {
        let config = BitacoraConfig::from_toml_str("[validation]\nenabled = false\n").unwrap();
        assert!(config.payload_schema().unwrap().is_none());
    }

    #[test]
    fn from_file_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("obra.schema.json"),
            r#"{ "type": "object", "required": ["author"] }"#,
        )
        .unwrap();
        let config_path = dir.path().join("bitacora.toml");
        std::fs::write(
            &config_path,
            "[store]\ndirectory = \"datos\"\n\n[validation]\njson_schema_file = \"obra.schema.json\"\n",
        )
        .unwrap();

        let config = BitacoraConfig::from_file(&config_path).unwrap();
        assert_eq!(config.store.directory, dir.path().join("datos"));

        let schema = config.payload_schema().unwrap().unwrap();
        assert_eq!(schema.json_schema, json!({ "type": "object", "required": ["author"] }));
    }

    #[test]
    fn missing_schema_file_is_config_error() {
        let config = BitacoraConfig::from_toml_str(
            "[validation]\njson_schema_file = \"/no/such/schema.json\"\n",
        )
        .unwrap();
        assert!(matches!(
            config.payload_schema(),
            Err(BitacoraError::ConfigError { .. })
        ));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let config = BitacoraConfig::load_or_default(Path::new("/no/such/bitacora.toml")).unwrap();
        assert_eq!(config.store.kind, StoreKind::File);
    }
}
