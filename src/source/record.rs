//! Record data structure.
//!
//! A [`Record`] is one row of the backing data source: an ordered mapping from
//! field name to [`FieldValue`]. Records flow from the source into the
//! document mapper, which turns them into the wire shape the remote search
//! service accepts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A single field value as read from the backing source.
///
/// Datetimes are kept as typed values until serialization so the document
/// mapper can encode them per the index's timestamp mode.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Render the value as a document key, if it is a usable key type.
    ///
    /// Primary keys on the remote service are strings or integers; anything
    /// else is not addressable as a document id.
    pub fn as_key(&self) -> Option<String> {
        match self {
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Plain JSON rendering, encoding datetimes as RFC 3339 strings.
    ///
    /// The document mapper overrides datetime encoding per index; this is the
    /// neutral form used everywhere else.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => {
                serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null)
            }
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            FieldValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            FieldValue::Object(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FieldValue::DateTime(dt)
    }
}

/// One row of the backing source, keyed by field name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Primary-key value rendered as a document key.
    pub fn key(&self, primary_key_field: &str) -> Option<String> {
        self.get(primary_key_field).and_then(FieldValue::as_key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

/// A record-level mutation observed on the backing source.
///
/// Carries the full affected record so handlers need no follow-up read.
#[derive(Debug, Clone)]
pub enum RecordEvent {
    /// A record was created or saved.
    Created(Record),
    /// A record was deleted.
    Deleted(Record),
}

impl RecordEvent {
    pub fn record(&self) -> &Record {
        match self {
            RecordEvent::Created(r) | RecordEvent::Deleted(r) => r,
        }
    }
}
