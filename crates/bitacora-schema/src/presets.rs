//! The default schema for site log records.

use serde_json::json;

use bitacora_contracts::{
    payload::{BitacoraRecord, EntryCategory},
    validation::{PayloadSchema, ValidationRule, ValidationRuleType},
};

pub const SITE_LOG_SCHEMA_ID: &str = "bitacora-obra-v1";

/// Longest description the site log accepts.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Schema for payloads produced by `BitacoraRecord::into_payload`.
///
/// Author and description must be non-empty, the category must be one of
/// the known categories, and attachments must carry name, media type and
/// size.
pub fn site_log_schema() -> PayloadSchema {
    let categories: Vec<&str> = EntryCategory::ALL.iter().map(|c| c.as_str()).collect();

    PayloadSchema {
        schema_id: SITE_LOG_SCHEMA_ID.to_string(),
        json_schema: json!({
            "type": "object",
            "properties": {
                "author": { "type": "string", "minLength": 1 },
                "category": { "type": "string", "enum": categories },
                "timestamp": { "type": "string" },
                "description": { "type": "string", "minLength": 1 },
                "attachments": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "minLength": 1 },
                            "media_type": { "type": "string" },
                            "size_bytes": { "type": "integer", "minimum": 0 }
                        },
                        "required": ["name", "media_type", "size_bytes"]
                    }
                },
                "corrects": { "type": ["string", "null"] }
            },
            "required": [
                "author",
                "category",
                "timestamp",
                "description"
            ]
        }),
        rules: vec![ValidationRule {
            rule_id: "description-length".to_string(),
            description: "descriptions stay readable in the dashboard list".to_string(),
            rule_type: ValidationRuleType::MaxLength {
                field_path: BitacoraRecord::FIELD_DESCRIPTION.to_string(),
                max_chars: MAX_DESCRIPTION_CHARS,
            },
        }],
    }
}
