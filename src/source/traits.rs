use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use super::record::{Record, RecordEvent};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source backend error: {0}")]
    Backend(String),
}

/// Declared type of one schema field.
///
/// Only `DateTime` changes serialization behavior (encoded per the index's
/// timestamp mode); the rest pass through as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Text,
    DateTime,
    Json,
}

/// A backing relational data source for one record type.
///
/// This is the interface boundary to the ORM/query layer: the sync engine
/// consumes field metadata, a record count, paged retrieval, and a stream of
/// post-create/post-delete events. It never writes to the source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Owning namespace of the record type (e.g. an application label).
    /// Combined with the declaration's local label to form the qualified
    /// registry label.
    fn namespace(&self) -> &str;

    /// Name of the record type itself.
    fn schema_name(&self) -> &str;

    /// Field names in schema-declared order.
    fn field_names(&self) -> Vec<String>;

    /// Declared field types, parallel to [`field_names`](Self::field_names).
    fn field_types(&self) -> Vec<FieldType>;

    /// Name of the schema's primary key field.
    fn primary_key(&self) -> &str;

    /// Total number of records.
    async fn count(&self) -> Result<u64, SourceError>;

    /// Fetch the slice `[offset, offset + limit)` in a stable order.
    ///
    /// Returns fewer than `limit` records at the tail, and an empty vec once
    /// `offset` is past the end.
    async fn fetch(&self, offset: u64, limit: usize) -> Result<Vec<Record>, SourceError>;

    /// Subscribe to post-create and post-delete events.
    ///
    /// Every subscriber sees every event from the point of subscription on;
    /// delivery is at-least-once from the caller's perspective (a lagging
    /// receiver may drop events, which the change-sync layer logs).
    fn subscribe(&self) -> broadcast::Receiver<RecordEvent>;
}
