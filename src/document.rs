//! Record-to-document serialization.
//!
//! A [`DocumentMapper`] is built once per index definition at registration
//! time: one encoder per schema field, with datetime fields switched between
//! numeric epoch seconds and textual ISO 8601 by the index's
//! [`TimestampMode`]. Serialization itself is then a straight walk over the
//! schema's field order.

use serde_json::Value;

use crate::remote::Document;
use crate::source::{FieldType, FieldValue, Record};

/// How datetime-valued fields are encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampMode {
    /// Numeric epoch seconds.
    #[default]
    EpochSeconds,
    /// Textual ISO 8601 / RFC 3339.
    Iso8601,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldEncoder {
    Passthrough,
    Timestamp(TimestampMode),
}

/// Serializes records of one schema into remote documents.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    fields: Vec<(String, FieldEncoder)>,
}

impl DocumentMapper {
    /// Build the field → encoder mapping. `names` and `types` come from the
    /// backing schema and are parallel; fields beyond the shorter list are
    /// treated as passthrough.
    pub fn new(names: &[String], types: &[FieldType], mode: TimestampMode) -> Self {
        let fields = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let encoder = match types.get(i) {
                    Some(FieldType::DateTime) => FieldEncoder::Timestamp(mode),
                    _ => FieldEncoder::Passthrough,
                };
                (name.clone(), encoder)
            })
            .collect();
        Self { fields }
    }

    /// Serialize one record. Fields absent from the record are emitted as
    /// null so every document carries the full schema shape.
    pub fn serialize(&self, record: &Record) -> Document {
        let mut doc = Document::new();
        for (name, encoder) in &self.fields {
            let value = match (record.get(name), encoder) {
                (Some(FieldValue::DateTime(dt)), FieldEncoder::Timestamp(mode)) => match mode {
                    TimestampMode::EpochSeconds => Value::from(dt.timestamp()),
                    TimestampMode::Iso8601 => Value::String(dt.to_rfc3339()),
                },
                (Some(value), _) => value.to_json(),
                (None, _) => Value::Null,
            };
            doc.insert(name.clone(), value);
        }
        doc
    }

    /// Serialize a batch in order.
    pub fn serialize_all(&self, records: &[Record]) -> Vec<Document> {
        records.iter().map(|r| self.serialize(r)).collect()
    }
}
