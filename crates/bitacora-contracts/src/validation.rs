//! Payload validation schema and report types.
//!
//! Before a payload is chained, an attached validator may check it against a
//! `PayloadSchema`. Only a passing `ValidationReport` lets the append
//! proceed; once chained, a payload can no longer be fixed in place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the validator checks payloads against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadSchema {
    /// Identifier for this schema (e.g. "bitacora-obra-v1").
    pub schema_id: String,
    /// JSON Schema document for structural validation. `Null` disables it.
    #[serde(default)]
    pub json_schema: Value,
    /// Field rules evaluated after structural validation.
    #[serde(default)]
    pub rules: Vec<ValidationRule>,
}

impl PayloadSchema {
    /// A schema with no structural document and no rules; every payload passes.
    pub fn permissive(schema_id: impl Into<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            json_schema: Value::Null,
            rules: Vec::new(),
        }
    }
}

/// A single rule applied to a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRule {
    pub rule_id: String,
    #[serde(default)]
    pub description: String,
    pub rule_type: ValidationRuleType,
}

/// The kinds of field checks supported out of the box.
///
/// Field paths use dot notation over the payload rendered as JSON, e.g.
/// `"description"` or `"location.zone"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationRuleType {
    /// The field must be present and not `Absent`.
    RequiredField { field_path: String },

    /// The field must equal one of `allowed`.
    AllowedValues {
        field_path: String,
        allowed: Vec<Value>,
    },

    /// The string field must not contain `pattern` as a substring.
    ForbiddenPattern { field_path: String, pattern: String },

    /// The string field must be at most `max_chars` characters long.
    MaxLength { field_path: String, max_chars: usize },

    /// Delegate to a function registered with the validator by name.
    Custom { function_name: String },
}

/// The result of running a `PayloadSchema` against a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    /// Every failure found. Empty on pass.
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn pass() -> Self {
        Self {
            passed: true,
            failures: Vec::new(),
        }
    }

    /// All failure messages joined into one line.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub rule_id: String,
    pub message: String,
}
