//! # bitacora-schema
//!
//! Payload validation for the bitácora hash chain.
//!
//! [`engine::SchemaValidator`] implements
//! [`bitacora_core::traits::PayloadValidator`]. Attach it to a
//! `ChainBuilder` and every payload is checked before it is chained, in two
//! phases:
//!
//! 1. **Structural**: JSON Schema validation via the `jsonschema` crate.
//! 2. **Field rules**: `RequiredField`, `AllowedValues`, `ForbiddenPattern`,
//!    `MaxLength`, `Custom`.
//!
//! [`presets::site_log_schema`] is the schema for `BitacoraRecord` payloads.

pub mod engine;
pub mod presets;

pub use engine::{CustomRuleFn, SchemaValidator, JSON_SCHEMA_RULE_ID};
pub use presets::site_log_schema;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use bitacora_contracts::{
        chain::ChainId,
        entry::LogEntry,
        error::{BitacoraError, BitacoraResult},
        payload::{Attachment, BitacoraRecord, EntryCategory, FieldValue, Payload},
        validation::{PayloadSchema, ValidationRule, ValidationRuleType},
    };
    use bitacora_core::{traits::ChainStore, ChainBuilder, PayloadValidator};

    use super::*;

    // ── Builder helpers ───────────────────────────────────────────────────────

    fn make_schema(json_schema: Value, rules: Vec<ValidationRule>) -> PayloadSchema {
        PayloadSchema {
            schema_id: "test-schema-v1".to_string(),
            json_schema,
            rules,
        }
    }

    fn rule(id: &str, rule_type: ValidationRuleType) -> ValidationRule {
        ValidationRule {
            rule_id: id.to_string(),
            description: String::new(),
            rule_type,
        }
    }

    fn validate(schema: PayloadSchema, payload: &Payload) -> bitacora_contracts::validation::ValidationReport {
        SchemaValidator::new(schema).unwrap().validate(payload).unwrap()
    }

    // ── JSON Schema ───────────────────────────────────────────────────────────

    #[test]
    fn schema_pass() {
        let schema = make_schema(
            json!({
                "type": "object",
                "properties": { "author": { "type": "string" } },
                "required": ["author"]
            }),
            vec![],
        );
        let report = validate(schema, &Payload::new().with("author", "Ing. Salas"));
        assert!(report.passed, "expected pass, failures: {:?}", report.failures);
    }

    #[test]
    fn schema_fail_is_reported_under_json_schema_rule_id() {
        let schema = make_schema(
            json!({
                "type": "object",
                "properties": { "author": { "type": "string" } },
                "required": ["author"]
            }),
            vec![],
        );
        let report = validate(schema, &Payload::new().with("crew", 4i64));
        assert!(!report.passed);
        assert_eq!(report.failures[0].rule_id, JSON_SCHEMA_RULE_ID);
    }

    #[test]
    fn invalid_schema_document_is_config_error() {
        let schema = make_schema(json!({ "type": 17 }), vec![]);
        match SchemaValidator::new(schema) {
            Err(BitacoraError::ConfigError { reason }) => {
                assert!(reason.contains("test-schema-v1"), "unexpected reason: {reason}")
            }
            Err(other) => panic!("expected ConfigError, got {:?}", other),
            Ok(_) => panic!("expected ConfigError, got a validator"),
        }
    }

    // ── Field rules ───────────────────────────────────────────────────────────

    /// `Absent` renders as null, which RequiredField treats as missing.
    #[test]
    fn required_field_rejects_absent() {
        let schema = make_schema(
            Value::Null,
            vec![rule(
                "req-supervisor",
                ValidationRuleType::RequiredField {
                    field_path: "supervisor".to_string(),
                },
            )],
        );

        let absent = Payload::new().with("supervisor", FieldValue::Absent);
        let report = validate(schema.clone(), &absent);
        assert!(!report.passed);
        assert_eq!(report.failures[0].rule_id, "req-supervisor");
        assert!(report.failures[0].message.contains("supervisor"));

        let present = Payload::new().with("supervisor", "Arq. Pinto");
        assert!(validate(schema, &present).passed);
    }

    #[test]
    fn required_field_resolves_nested_paths() {
        let mut location = std::collections::BTreeMap::new();
        location.insert("zone".to_string(), FieldValue::from("Torre A"));
        let payload = Payload::new().with("location", FieldValue::Map(location));

        let schema = make_schema(
            Value::Null,
            vec![rule(
                "req-zone",
                ValidationRuleType::RequiredField {
                    field_path: "location.zone".to_string(),
                },
            )],
        );
        assert!(validate(schema, &payload).passed);
    }

    #[test]
    fn allowed_values() {
        let schema = make_schema(
            Value::Null,
            vec![rule(
                "allowed-category",
                ValidationRuleType::AllowedValues {
                    field_path: "category".to_string(),
                    allowed: vec![json!("incident"), json!("safety")],
                },
            )],
        );

        assert!(validate(schema.clone(), &Payload::new().with("category", "safety")).passed);

        let report = validate(schema, &Payload::new().with("category", "note"));
        assert!(!report.passed);
        assert!(report.failures[0].message.contains("not in the allowed set"));
    }

    #[test]
    fn forbidden_pattern_only_applies_to_strings() {
        let schema = make_schema(
            Value::Null,
            vec![rule(
                "no-placeholder",
                ValidationRuleType::ForbiddenPattern {
                    field_path: "description".to_string(),
                    pattern: "TODO".to_string(),
                },
            )],
        );

        let bad = Payload::new().with("description", "TODO completar");
        assert!(!validate(schema.clone(), &bad).passed);

        let number = Payload::new().with("description", 5i64);
        assert!(validate(schema.clone(), &number).passed);

        assert!(validate(schema, &Payload::new()).passed);
    }

    #[test]
    fn max_length_counts_characters_not_bytes() {
        let schema = make_schema(
            Value::Null,
            vec![rule(
                "short",
                ValidationRuleType::MaxLength {
                    field_path: "description".to_string(),
                    max_chars: 4,
                },
            )],
        );

        // Four characters, eight bytes.
        assert!(validate(schema.clone(), &Payload::new().with("description", "ñáéí")).passed);

        let report = validate(schema, &Payload::new().with("description", "ñáéíó"));
        assert!(!report.passed);
        assert!(report.failures[0].message.contains("5 characters"));
    }

    #[test]
    fn custom_rule_registered_and_unregistered() {
        let schema = make_schema(
            Value::Null,
            vec![rule(
                "night-shift-needs-supervisor",
                ValidationRuleType::Custom {
                    function_name: "night_shift".to_string(),
                },
            )],
        );

        // Not registered: the rule itself fails.
        let unregistered = validate(schema.clone(), &Payload::new());
        assert!(!unregistered.passed);
        assert!(unregistered.failures[0].message.contains("no custom rule registered"));

        let mut validator = SchemaValidator::new(schema).unwrap();
        validator.register_rule(
            "night_shift",
            Box::new(|payload| {
                let night = payload.get("night_shift").and_then(Value::as_bool).unwrap_or(false);
                let supervised = payload.get("supervisor").is_some_and(|v| !v.is_null());
                (night && !supervised).then(|| "night shift entries need a supervisor".to_string())
            }),
        );

        let day = Payload::new().with("night_shift", false);
        assert!(validator.validate(&day).unwrap().passed);

        let night = Payload::new().with("night_shift", true);
        assert!(!validator.validate(&night).unwrap().passed);
    }

    /// Every failure is collected, not just the first.
    #[test]
    fn all_failures_are_collected() {
        let schema = make_schema(
            json!({ "type": "object", "required": ["author"] }),
            vec![
                rule("r1", ValidationRuleType::RequiredField { field_path: "description".to_string() }),
                rule("r2", ValidationRuleType::RequiredField { field_path: "category".to_string() }),
            ],
        );

        let report = validate(schema, &Payload::new());
        assert_eq!(report.failures.len(), 3);
        assert!(report.summary().contains("[r2]"));
    }

    // ── Site log preset ───────────────────────────────────────────────────────

    #[test]
    fn site_log_schema_accepts_well_formed_records() {
        let payload = BitacoraRecord::new("Ing. Salas", EntryCategory::Delivery, "Llegó acero")
            .with_attachment(Attachment {
                name: "remision.pdf".to_string(),
                media_type: "application/pdf".to_string(),
                size_bytes: 48_213,
                sha256: None,
            })
            .into_payload().unwrap();

        let report = validate(site_log_schema(), &payload);
        assert!(report.passed, "failures: {}", report.summary());
    }

    #[test]
    fn site_log_schema_rejects_empty_author_and_description() {
        let payload = BitacoraRecord::new("", EntryCategory::Note, "").into_payload().unwrap();
        let report = validate(site_log_schema(), &payload);
        assert!(!report.passed);
        assert!(report.failures.iter().all(|f| f.rule_id == JSON_SCHEMA_RULE_ID));
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn site_log_schema_limits_description_length() {
        let long = "a".repeat(presets::MAX_DESCRIPTION_CHARS + 1);
        let payload = BitacoraRecord::new("Ing. Salas", EntryCategory::Note, long).into_payload().unwrap();
        let report = validate(site_log_schema(), &payload);
        assert!(!report.passed);
        assert_eq!(report.failures[0].rule_id, "description-length");
    }

    // ── Wired into the builder ────────────────────────────────────────────────

    struct NullStore;

    impl ChainStore for NullStore {
        fn load_chain(&self, _chain_id: &ChainId) -> BitacoraResult<Vec<LogEntry>> {
            Ok(Vec::new())
        }

        fn persist_entry(&self, _chain_id: &ChainId, _entry: &LogEntry) -> BitacoraResult<()> {
            Ok(())
        }

        fn chain_ids(&self) -> BitacoraResult<Vec<ChainId>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn builder_with_site_log_schema_rejects_bad_records() {
        let validator = SchemaValidator::new(site_log_schema()).unwrap();
        let builder = ChainBuilder::new(Arc::new(NullStore)).with_validator(Box::new(validator));
        let id = ChainId::new("obra-1").unwrap();

        let err = builder
            .append_record(&id, BitacoraRecord::new("", EntryCategory::Incident, "Caída de material"))
            .unwrap_err();
        assert!(matches!(err, BitacoraError::InvalidPayload { .. }));

        let ok = builder
            .append_record(&id, BitacoraRecord::new("Ing. Salas", EntryCategory::Incident, "Caída de material"))
            .unwrap();
        assert_eq!(ok.sequence_number, 0);
    }
}
