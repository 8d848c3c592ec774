//! Schema-based payload validator.
//!
//! `SchemaValidator` implements `PayloadValidator` from `bitacora-core`.
//! Validation runs in two phases over the payload rendered as JSON
//! (`Absent` becomes `null`):
//!
//! 1. **Structural**: the `PayloadSchema::json_schema` document, compiled
//!    once with the `jsonschema` crate.
//! 2. **Field rules**: each `ValidationRule` in order. All failures are
//!    collected so the author of a rejected entry sees every problem at once.
//!
//! Custom rules delegate to named functions registered via `register_rule`.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use bitacora_contracts::{
    error::{BitacoraError, BitacoraResult},
    payload::Payload,
    validation::{PayloadSchema, ValidationFailure, ValidationReport, ValidationRuleType},
};
use bitacora_core::traits::PayloadValidator;

/// A caller-supplied check over the JSON form of a payload.
///
/// Returns `Some(message)` when the check fails, `None` on success.
pub type CustomRuleFn = Box<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Rule id reported for structural (JSON Schema) failures.
pub const JSON_SCHEMA_RULE_ID: &str = "json-schema";

/// Validates payloads against one `PayloadSchema`.
pub struct SchemaValidator {
    schema: PayloadSchema,
    /// `None` when the schema has no structural document.
    compiled: Option<jsonschema::Validator>,
    custom_rules: HashMap<String, CustomRuleFn>,
}

impl SchemaValidator {
    /// Compile `schema` into a validator.
    ///
    /// Returns `ConfigError` if the JSON Schema document is itself invalid.
    pub fn new(schema: PayloadSchema) -> BitacoraResult<Self> {
        let compiled = if schema.json_schema.is_null() {
            None
        } else {
            Some(
                jsonschema::validator_for(&schema.json_schema).map_err(|e| {
                    BitacoraError::ConfigError {
                        reason: format!(
                            "invalid JSON Schema document in '{}': {e}",
                            schema.schema_id
                        ),
                    }
                })?,
            )
        };
        Ok(Self {
            schema,
            compiled,
            custom_rules: HashMap::new(),
        })
    }

    pub fn schema(&self) -> &PayloadSchema {
        &self.schema
    }

    /// Register a custom rule function under `name`.
    ///
    /// The name must match `function_name` in a `Custom` rule. Registering
    /// the same name twice replaces the previous function.
    pub fn register_rule(&mut self, name: impl Into<String>, f: CustomRuleFn) {
        self.custom_rules.insert(name.into(), f);
    }

    /// Resolve a dot-notation path (e.g. `"location.zone"`). `None` when any
    /// segment is missing or the value is `null`.
    fn resolve_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
        let mut current = value;
        for segment in path.split('.') {
            match current.get(segment) {
                Some(v) if !v.is_null() => current = v,
                _ => return None,
            }
        }
        Some(current)
    }

    fn check_rule(&self, rule_type: &ValidationRuleType, payload: &Value) -> Option<String> {
        match rule_type {
            ValidationRuleType::RequiredField { field_path } => {
                match Self::resolve_path(payload, field_path) {
                    None => Some(format!("required field '{field_path}' is missing or absent")),
                    Some(_) => None,
                }
            }

            ValidationRuleType::AllowedValues { field_path, allowed } => {
                match Self::resolve_path(payload, field_path) {
                    None => Some(format!(
                        "field '{field_path}' is missing; cannot check allowed values"
                    )),
                    Some(actual) if allowed.contains(actual) => None,
                    Some(actual) => Some(format!(
                        "field '{field_path}' has value {actual} which is not in the allowed set"
                    )),
                }
            }

            // Only meaningful for strings; absent or non-string fields pass.
            ValidationRuleType::ForbiddenPattern { field_path, pattern } => {
                Self::resolve_path(payload, field_path)
                    .and_then(Value::as_str)
                    .filter(|s| s.contains(pattern.as_str()))
                    .map(|_| format!("field '{field_path}' contains forbidden pattern '{pattern}'"))
            }

            ValidationRuleType::MaxLength { field_path, max_chars } => {
                Self::resolve_path(payload, field_path)
                    .and_then(Value::as_str)
                    .map(|s| s.chars().count())
                    .filter(|len| len > max_chars)
                    .map(|len| {
                        format!("field '{field_path}' is {len} characters long; the limit is {max_chars}")
                    })
            }

            // An unregistered name is itself a failure so misconfiguration
            // surfaces on the first append.
            ValidationRuleType::Custom { function_name } => {
                match self.custom_rules.get(function_name.as_str()) {
                    Some(f) => f(payload),
                    None => Some(format!(
                        "no custom rule registered for function name '{function_name}'"
                    )),
                }
            }
        }
    }
}

impl PayloadValidator for SchemaValidator {
    fn validate(&self, payload: &Payload) -> BitacoraResult<ValidationReport> {
        let json = payload.to_json();
        let mut failures: Vec<ValidationFailure> = Vec::new();

        // ── Phase 1: JSON Schema ──────────────────────────────────────────────
        if let Some(compiled) = &self.compiled {
            for error in compiled.iter_errors(&json) {
                let message = format!("JSON Schema violation at {}: {}", error.instance_path, error);
                warn!(schema_id = %self.schema.schema_id, %message, "structural validation failure");
                failures.push(ValidationFailure {
                    rule_id: JSON_SCHEMA_RULE_ID.to_string(),
                    message,
                });
            }
        }

        // ── Phase 2: Field rules ──────────────────────────────────────────────
        for rule in &self.schema.rules {
            debug!(rule_id = %rule.rule_id, "evaluating payload rule");

            if let Some(message) = self.check_rule(&rule.rule_type, &json) {
                warn!(rule_id = %rule.rule_id, %message, "payload rule failed");
                failures.push(ValidationFailure {
                    rule_id: rule.rule_id.clone(),
                    message,
                });
            }
        }

        let passed = failures.is_empty();
        debug!(
            schema_id = %self.schema.schema_id,
            passed,
            failure_count = failures.len(),
            "payload validation complete"
        );

        Ok(ValidationReport { passed, failures })
    }
}
