//! Entry payloads.
//!
//! A `Payload` is the business content of a log entry: an ordered mapping of
//! field names to `FieldValue`s. Keys are held in a `BTreeMap` so the order
//! in which fields were inserted never reaches the canonical byte form.
//!
//! `BitacoraRecord` is the typed record the site log actually writes
//! (author, category, timestamp, description, attachments). It converts into
//! a `Payload`; the chain itself only ever sees the `Payload`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    chain::EntryId,
    error::{BitacoraError, BitacoraResult},
};

/// A single payload value.
///
/// `Absent` is the reserved representation of an empty optional field. It
/// is never dropped from the payload, so "absent" and "empty text" hash
/// differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Absent,
    Text(String),
    Integer(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Render as plain JSON: `Absent` becomes `null` and timestamps become
    /// RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            FieldValue::Absent => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Integer(n) => Value::from(*n),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Timestamp(t) => {
                Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            FieldValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            FieldValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(t)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Absent)
    }
}

/// The semantic content of one log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, FieldValue>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.0.get_mut(key)
    }

    /// Fields in key order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The entry this payload corrects.
    ///
    /// A missing or `Absent` `corrects` field is `Ok(None)`. Any other value
    /// must be the text of an entry id; anything else is `InvalidPayload`.
    pub fn corrects(&self) -> BitacoraResult<Option<EntryId>> {
        match self.get(BitacoraRecord::FIELD_CORRECTS) {
            None | Some(FieldValue::Absent) => Ok(None),
            Some(FieldValue::Text(s)) => {
                s.parse()
                    .map(Some)
                    .map_err(|e| BitacoraError::InvalidPayload {
                        reason: format!("'{}' is not an entry id: {e}", BitacoraRecord::FIELD_CORRECTS),
                    })
            }
            Some(other) => Err(BitacoraError::InvalidPayload {
                reason: format!(
                    "'{}' must be an entry id, got {}",
                    BitacoraRecord::FIELD_CORRECTS,
                    other.to_json()
                ),
            }),
        }
    }

    /// Render the payload as a JSON object. Used by validators.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, FieldValue)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The kind of event a site log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    Incident,
    Progress,
    Inspection,
    Delivery,
    Safety,
    Note,
}

impl EntryCategory {
    pub const ALL: [EntryCategory; 6] = [
        EntryCategory::Incident,
        EntryCategory::Progress,
        EntryCategory::Inspection,
        EntryCategory::Delivery,
        EntryCategory::Safety,
        EntryCategory::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCategory::Incident => "incident",
            EntryCategory::Progress => "progress",
            EntryCategory::Inspection => "inspection",
            EntryCategory::Delivery => "delivery",
            EntryCategory::Safety => "safety",
            EntryCategory::Note => "note",
        }
    }
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// Metadata about a file attached to a log entry.
///
/// Only metadata is chained; the file bytes live elsewhere. When `sha256`
/// is present the attachment content is committed to indirectly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub media_type: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub sha256: Option<String>,
}

impl Attachment {
    fn to_field(&self) -> BitacoraResult<FieldValue> {
        let size_bytes = i64::try_from(self.size_bytes).map_err(|_| BitacoraError::InvalidPayload {
            reason: format!(
                "attachment '{}' size {} exceeds the largest chainable size {}",
                self.name,
                self.size_bytes,
                i64::MAX
            ),
        })?;
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), FieldValue::from(self.name.as_str()));
        map.insert(
            "media_type".to_string(),
            FieldValue::from(self.media_type.as_str()),
        );
        map.insert("size_bytes".to_string(), FieldValue::Integer(size_bytes));
        map.insert("sha256".to_string(), FieldValue::from(self.sha256.clone()));
        Ok(FieldValue::Map(map))
    }
}

/// A typed site log record, as written by the bitácora.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitacoraRecord {
    pub author: String,
    pub category: EntryCategory,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// The entry this record corrects. Corrections never edit in place.
    #[serde(default)]
    pub corrects: Option<EntryId>,
}

impl BitacoraRecord {
    pub const FIELD_AUTHOR: &'static str = "author";
    pub const FIELD_CATEGORY: &'static str = "category";
    pub const FIELD_TIMESTAMP: &'static str = "timestamp";
    pub const FIELD_DESCRIPTION: &'static str = "description";
    pub const FIELD_ATTACHMENTS: &'static str = "attachments";
    pub const FIELD_CORRECTS: &'static str = "corrects";

    pub fn new(
        author: impl Into<String>,
        category: EntryCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            category,
            timestamp: Utc::now(),
            description: description.into(),
            attachments: Vec::new(),
            corrects: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn correcting(mut self, entry: EntryId) -> Self {
        self.corrects = Some(entry);
        self
    }

    /// Convert into the payload that gets chained.
    ///
    /// All six fields are always present; `corrects` is `Absent` for
    /// ordinary entries. Fails with `InvalidPayload` if an attachment size
    /// does not fit the signed 64-bit integer the payload stores.
    pub fn into_payload(self) -> BitacoraResult<Payload> {
        let attachments = self
            .attachments
            .iter()
            .map(Attachment::to_field)
            .collect::<BitacoraResult<Vec<_>>>()?;
        Ok(Payload::new()
            .with(Self::FIELD_AUTHOR, self.author)
            .with(Self::FIELD_CATEGORY, self.category.as_str())
            .with(Self::FIELD_TIMESTAMP, self.timestamp)
            .with(Self::FIELD_DESCRIPTION, self.description)
            .with(Self::FIELD_ATTACHMENTS, FieldValue::List(attachments))
            .with(
                Self::FIELD_CORRECTS,
                self.corrects.map(|id| id.to_string()),
            ))
    }
}

impl TryFrom<BitacoraRecord> for Payload {
    type Error = BitacoraError;

    fn try_from(record: BitacoraRecord) -> BitacoraResult<Self> {
        record.into_payload()
    }
}
