// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The top-level engine facade.
//!
//! [`SearchSync`] wires the registry, index operations, and change sync
//! together behind one handle. Registering a declaration here both validates
//! it and starts live change propagation for its backing schema; removing the
//! last index over a schema stops the listener again.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::change_sync::ChangeSync;
use crate::config::SearchSyncConfig;
use crate::index::{CleanReport, CreateOutcome, IndexOps, PopulateError};
use crate::query::{self, SearchOptions, SearchOutcome};
use crate::registry::{schema_key, IndexDeclaration, IndexDefinition, IndexRegistry};
use crate::remote::{RemoteError, SearchClient, SearchResults, TaskHandle};
use crate::schema::ConfigError;
use crate::source::Record;

/// Errors from engine-level operations addressed by index name or label.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no registered index matches `{0}`")]
    UnknownIndex(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Populate(#[from] PopulateError),
}

/// Synchronization engine: one per remote service connection.
pub struct SearchSync {
    registry: Arc<IndexRegistry>,
    ops: IndexOps,
    changes: ChangeSync,
}

impl SearchSync {
    pub fn new(client: Arc<dyn SearchClient>, config: SearchSyncConfig) -> Self {
        let registry = Arc::new(IndexRegistry::new(config.default_batch_size));
        let poll = config.poll_config();
        let ops = IndexOps::new(Arc::clone(&client), poll.clone());
        let changes = ChangeSync::new(client, Arc::clone(&registry), poll);
        Self {
            registry,
            ops,
            changes,
        }
    }

    /// Validate and register a declaration, and start mirroring changes from
    /// its backing schema. Fails without side effects on invalid input.
    ///
    /// Re-registering a label (declaration reload) rewires the change
    /// listener when the backing source instance changed, so events from the
    /// new source keep flowing.
    pub fn register(
        &self,
        declaration: IndexDeclaration,
    ) -> Result<Arc<IndexDefinition>, ConfigError> {
        let label = format!(
            "{}.{}",
            declaration.source.namespace(),
            declaration.label
        );
        let prior_source = self.registry.get(&label).map(|old| Arc::clone(&old.source));

        let def = self.registry.register(declaration)?;
        match prior_source {
            Some(old) if !Arc::ptr_eq(&old, &def.source) => {
                let old_key = schema_key(&*old);
                if old_key == schema_key(&*def.source) {
                    self.changes.rewatch(&def.source);
                } else {
                    self.changes.unwatch(&old_key);
                    self.changes.watch(&def.source);
                }
            }
            _ => {
                self.changes.watch(&def.source);
            }
        }
        info!(index = %def.name, label = %def.qualified_label, "Index registered");
        Ok(def)
    }

    /// Drop a registration by name or label. The schema's change listener is
    /// stopped once no other index references it. The remote index itself is
    /// untouched; call [`destroy`](Self::destroy) first to delete it.
    pub fn remove(&self, name_or_label: &str) -> Option<Arc<IndexDefinition>> {
        let def = self.registry.resolve(name_or_label)?;
        let removed = self.registry.remove(&def.qualified_label)?;
        self.changes.unwatch(&schema_key(&*removed.source));
        info!(index = %removed.name, "Index registration removed");
        Some(removed)
    }

    /// Look up a registered definition by public name or qualified label.
    pub fn resolve(&self, name_or_label: &str) -> Option<Arc<IndexDefinition>> {
        self.registry.resolve(name_or_label)
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    fn lookup(&self, name_or_label: &str) -> Result<Arc<IndexDefinition>, EngineError> {
        self.registry
            .resolve(name_or_label)
            .ok_or_else(|| EngineError::UnknownIndex(name_or_label.to_string()))
    }

    pub async fn create(&self, name_or_label: &str) -> Result<CreateOutcome, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.ops.create(&def).await?)
    }

    pub async fn destroy(&self, name_or_label: &str) -> Result<TaskHandle, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.ops.destroy(&def).await?)
    }

    pub async fn clean(&self, name_or_label: &str) -> Result<CleanReport, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.ops.clean(&def).await?)
    }

    pub async fn populate(&self, name_or_label: &str) -> Result<Vec<TaskHandle>, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.ops.populate(&def).await?)
    }

    pub async fn populate_detached(
        &self,
        name_or_label: &str,
    ) -> Result<Vec<TaskHandle>, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.ops.populate_detached(&def).await?)
    }

    /// Wipe and repopulate from the backing dataset.
    pub async fn rebuild(&self, name_or_label: &str) -> Result<Vec<TaskHandle>, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.ops.rebuild(&def).await?)
    }

    pub async fn document_count(&self, name_or_label: &str) -> Result<u64, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.ops.document_count(&def).await?)
    }

    /// Upsert one record synchronously, waiting for the remote task.
    pub async fn upsert_now(
        &self,
        name_or_label: &str,
        record: &Record,
    ) -> Result<TaskHandle, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.changes.upsert_now(&def, record).await?)
    }

    /// Remove one record's document synchronously, waiting for the remote
    /// task.
    pub async fn remove_now(
        &self,
        name_or_label: &str,
        record: &Record,
    ) -> Result<TaskHandle, EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(self.changes.remove_now(&def, record).await?)
    }

    /// Search a registered index. Remote failures are folded into the
    /// returned results (see [`query::search`]); only an unknown index is an
    /// error here.
    pub async fn search(
        &self,
        name_or_label: &str,
        term: &str,
        options: SearchOptions,
    ) -> Result<(SearchResults, SearchOutcome), EngineError> {
        let def = self.lookup(name_or_label)?;
        Ok(query::search(&*self.ops.client, &def, term, options).await)
    }

    /// Stop all change listeners. Registrations stay intact.
    pub fn shutdown(&self) {
        self.changes.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryBackend;
    use crate::source::{FieldType, MemorySource};

    fn posts_source() -> Arc<MemorySource> {
        Arc::new(MemorySource::new(
            "blog",
            "Post",
            vec![
                ("id".to_string(), FieldType::Int),
                ("title".to_string(), FieldType::Text),
            ],
            "id",
        ))
    }

    fn engine() -> (SearchSync, Arc<MemorySource>) {
        let source = posts_source();
        let backend = Arc::new(MemoryBackend::new());
        let mut config = SearchSyncConfig::default();
        config.poll_initial_interval_ms = 1;
        config.poll_max_interval_ms = 5;
        (SearchSync::new(backend, config), source)
    }

    #[tokio::test]
    async fn test_register_starts_change_listener() {
        let (engine, source) = engine();
        engine
            .register(IndexDeclaration::new("posts", "PostIndex", source))
            .unwrap();

        assert!(engine.resolve("posts").is_some());
        assert!(engine.resolve("blog.PostIndex").is_some());
    }

    #[tokio::test]
    async fn test_unknown_index_is_an_engine_error() {
        let (engine, _source) = engine();
        let err = engine.create("nope").await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownIndex(_)));
    }

    #[tokio::test]
    async fn test_remove_by_name_or_label() {
        let (engine, source) = engine();
        engine
            .register(IndexDeclaration::new("posts", "PostIndex", source))
            .unwrap();

        let removed = engine.remove("posts").unwrap();
        assert_eq!(removed.qualified_label, "blog.PostIndex");
        assert!(engine.resolve("posts").is_none());
        assert!(engine.remove("posts").is_none());
    }

    #[tokio::test]
    async fn test_reload_with_new_source_keeps_propagating() {
        let (engine, source) = engine();
        engine
            .register(IndexDeclaration::new("posts", "PostIndex", source))
            .unwrap();
        engine.create("posts").await.unwrap();

        // Declaration reload: same label, fresh source instance.
        let reloaded = posts_source();
        engine
            .register(IndexDeclaration::new("posts", "PostIndex", reloaded.clone()))
            .unwrap();

        reloaded.insert(
            crate::source::Record::new()
                .with("id", 1i64)
                .with("title", "after reload"),
        );
        for _ in 0..200 {
            if engine.document_count("posts").await.unwrap() == 1 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("insert on the reloaded source never reached the index");
    }

    #[tokio::test]
    async fn test_full_lifecycle_through_the_facade() {
        let (engine, source) = engine();
        for i in 0..4 {
            source.insert(
                crate::source::Record::new()
                    .with("id", i as i64)
                    .with("title", format!("post {i}")),
            );
        }
        engine
            .register(IndexDeclaration::new("posts", "PostIndex", source))
            .unwrap();

        engine.create("posts").await.unwrap();
        engine.populate("posts").await.unwrap();
        assert_eq!(engine.document_count("posts").await.unwrap(), 4);

        let report = engine.clean("posts").await.unwrap();
        assert_eq!(report.documents_cleaned, 4);

        engine.destroy("posts").await.unwrap();
        let err = engine.document_count("posts").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Remote(RemoteError::IndexNotFound { .. })
        ));
    }
}
