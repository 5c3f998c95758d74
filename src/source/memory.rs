//! In-memory data source.
//!
//! Backs tests and demos with a fully functional [`DataSource`]: records are
//! held in insertion order, and insert/delete emit [`RecordEvent`]s on a
//! broadcast channel exactly like a production source would.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::record::{Record, RecordEvent};
use super::traits::{DataSource, FieldType, SourceError};

/// Capacity of the event channel. Slow subscribers past this lag drop events.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct MemorySource {
    namespace: String,
    schema_name: String,
    fields: Vec<(String, FieldType)>,
    primary_key: String,
    records: RwLock<Vec<Record>>,
    events: broadcast::Sender<RecordEvent>,
}

impl MemorySource {
    pub fn new(
        namespace: impl Into<String>,
        schema_name: impl Into<String>,
        fields: Vec<(String, FieldType)>,
        primary_key: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            namespace: namespace.into(),
            schema_name: schema_name.into(),
            fields,
            primary_key: primary_key.into(),
            records: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Insert a record and emit a `Created` event.
    ///
    /// An existing record with the same primary-key value is replaced in
    /// place, keeping its position in the insertion order.
    pub fn insert(&self, record: Record) {
        let key = record.key(&self.primary_key);
        {
            let mut records = self.records.write();
            match key
                .as_deref()
                .and_then(|k| records.iter().position(|r| r.key(&self.primary_key).as_deref() == Some(k)))
            {
                Some(pos) => records[pos] = record.clone(),
                None => records.push(record.clone()),
            }
        }
        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.events.send(RecordEvent::Created(record));
    }

    /// Delete the record with the given primary-key value, emitting a
    /// `Deleted` event carrying the removed record. No-op when absent.
    pub fn delete(&self, key: &str) -> Option<Record> {
        let removed = {
            let mut records = self.records.write();
            records
                .iter()
                .position(|r| r.key(&self.primary_key).as_deref() == Some(key))
                .map(|pos| records.remove(pos))
        };
        if let Some(record) = removed.clone() {
            let _ = self.events.send(RecordEvent::Deleted(record));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn schema_name(&self) -> &str {
        &self.schema_name
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }

    fn field_types(&self) -> Vec<FieldType> {
        self.fields.iter().map(|(_, ty)| *ty).collect()
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    async fn count(&self) -> Result<u64, SourceError> {
        Ok(self.records.read().len() as u64)
    }

    async fn fetch(&self, offset: u64, limit: usize) -> Result<Vec<Record>, SourceError> {
        let records = self.records.read();
        let start = offset.min(records.len() as u64) as usize;
        let end = (start + limit).min(records.len());
        Ok(records[start..end].to_vec())
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.events.subscribe()
    }
}
