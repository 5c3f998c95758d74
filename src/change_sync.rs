// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Live change propagation from data sources to remote indexes.
//!
//! [`ChangeSync`] subscribes to the broadcast stream of a backing schema and
//! mirrors every create/update/delete into all indexes registered for that
//! schema. Propagation is at-least-once and fire-and-forget: a failed remote
//! call is logged and counted, never retried here, and never blocks the
//! source-side writer.
//!
//! Listener tasks are keyed by qualified schema (see
//! [`schema_key`](crate::registry::schema_key)); watching the same schema
//! twice is a no-op, so several indexes over one schema share one listener.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::metrics;
use crate::registry::{schema_key, IndexDefinition, IndexRegistry};
use crate::remote::{await_completion, PollConfig, RemoteError, SearchClient, TaskHandle};
use crate::source::{DataSource, Record, RecordEvent};

/// Bridges source change events to the remote service.
pub struct ChangeSync {
    client: Arc<dyn SearchClient>,
    registry: Arc<IndexRegistry>,
    poll: PollConfig,
    listeners: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl ChangeSync {
    pub fn new(
        client: Arc<dyn SearchClient>,
        registry: Arc<IndexRegistry>,
        poll: PollConfig,
    ) -> Self {
        Self {
            client,
            registry,
            poll,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Start mirroring changes from `source`. Returns `false` if a listener
    /// for its schema is already running.
    pub fn watch(&self, source: &Arc<dyn DataSource>) -> bool {
        let key = schema_key(&**source);
        let mut listeners = self.listeners.lock();
        if listeners.contains_key(&key) {
            return false;
        }
        let handle = self.spawn_listener(source, key.clone());
        listeners.insert(key, handle);
        true
    }

    /// Replace the listener for the source's schema, subscribing to this
    /// source instance's stream. Used when a declaration reload swapped the
    /// backing source out from under a running listener; the old listener
    /// would otherwise keep draining a channel nothing writes to anymore.
    pub fn rewatch(&self, source: &Arc<dyn DataSource>) {
        let key = schema_key(&**source);
        let mut listeners = self.listeners.lock();
        let handle = self.spawn_listener(source, key.clone());
        if let Some(old) = listeners.insert(key.clone(), handle) {
            old.abort();
            debug!(schema = %key, "Change listener replaced");
        }
    }

    fn spawn_listener(&self, source: &Arc<dyn DataSource>, key: String) -> JoinHandle<()> {
        let mut rx = source.subscribe();
        let client = Arc::clone(&self.client);
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => dispatch(&client, &registry, &key, &event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(schema = %key, skipped, "Change stream lagged, events dropped");
                        metrics::record_change_event("lagged", "error");
                    }
                    Err(RecvError::Closed) => {
                        debug!(schema = %key, "Change stream closed");
                        break;
                    }
                }
            }
        })
    }

    /// Whether a listener is running for the given schema key.
    pub fn is_watching(&self, key: &str) -> bool {
        self.listeners.lock().contains_key(key)
    }

    /// Stop the listener for a schema key, but only once no registered
    /// definition references that schema anymore. Returns `true` if the
    /// listener was stopped.
    pub fn unwatch(&self, key: &str) -> bool {
        if !self.registry.for_schema(key).is_empty() {
            return false;
        }
        match self.listeners.lock().remove(key) {
            Some(handle) => {
                handle.abort();
                debug!(schema = %key, "Change listener stopped");
                true
            }
            None => false,
        }
    }

    /// Stop all listeners unconditionally.
    pub fn shutdown(&self) {
        let mut listeners = self.listeners.lock();
        for (key, handle) in listeners.drain() {
            handle.abort();
            debug!(schema = %key, "Change listener stopped");
        }
    }

    /// Upsert one record into an index and wait for the remote task.
    pub async fn upsert_now(
        &self,
        def: &IndexDefinition,
        record: &Record,
    ) -> Result<TaskHandle, RemoteError> {
        let document = def.mapper.serialize(record);
        let submitted = self
            .client
            .add_documents(&def.name, vec![document], &def.primary_key_field)
            .await?;
        await_completion(&*self.client, submitted.id, &self.poll).await
    }

    /// Delete one record's document from an index and wait for the remote
    /// task. The record must carry a usable primary-key value.
    pub async fn remove_now(
        &self,
        def: &IndexDefinition,
        record: &Record,
    ) -> Result<TaskHandle, RemoteError> {
        let id = record
            .key(&def.primary_key_field)
            .ok_or_else(|| RemoteError::Api {
                status_code: None,
                code: "invalid_document_id".to_string(),
                message: format!(
                    "record has no usable `{}` value to delete by",
                    def.primary_key_field
                ),
            })?;
        let submitted = self.client.delete_document(&def.name, &id).await?;
        await_completion(&*self.client, submitted.id, &self.poll).await
    }
}

impl Drop for ChangeSync {
    fn drop(&mut self) {
        for handle in self.listeners.get_mut().values() {
            handle.abort();
        }
    }
}

/// Fan one event out to every index registered for the schema.
async fn dispatch(
    client: &Arc<dyn SearchClient>,
    registry: &Arc<IndexRegistry>,
    key: &str,
    event: &RecordEvent,
) {
    for def in registry.for_schema(key) {
        match event {
            RecordEvent::Created(record) => upsert(client, &def, record).await,
            RecordEvent::Deleted(record) => remove(client, &def, record).await,
        }
    }
}

async fn upsert(client: &Arc<dyn SearchClient>, def: &IndexDefinition, record: &Record) {
    let document = def.mapper.serialize(record);
    match client
        .add_documents(&def.name, vec![document], &def.primary_key_field)
        .await
    {
        Ok(task) => {
            debug!(index = %def.name, task_id = task.id, "Change upsert submitted");
            metrics::record_change_event("upsert", "success");
        }
        Err(e) => {
            warn!(index = %def.name, error = %e, "Change upsert failed");
            metrics::record_change_event("upsert", "error");
        }
    }
}

async fn remove(client: &Arc<dyn SearchClient>, def: &IndexDefinition, record: &Record) {
    let Some(id) = record.key(&def.primary_key_field) else {
        warn!(
            index = %def.name,
            field = %def.primary_key_field,
            "Deleted record carries no usable key, skipping"
        );
        metrics::record_change_event("delete", "error");
        return;
    };
    match client.delete_document(&def.name, &id).await {
        Ok(task) => {
            debug!(index = %def.name, task_id = task.id, "Change delete submitted");
            metrics::record_change_event("delete", "success");
        }
        Err(e) => {
            warn!(index = %def.name, error = %e, "Change delete failed");
            metrics::record_change_event("delete", "error");
        }
    }
}
