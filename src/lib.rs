// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # searchsync
//!
//! Declarative synchronization between relational-style data sources and a
//! document search service.
//!
//! An index is described once as an [`IndexDeclaration`]: which source backs
//! it, which fields are searchable, filterable, and sortable, and how the
//! remote index is named. Registering the declaration validates it eagerly
//! and from then on the engine keeps the remote index aligned with the
//! source: bulk population in batches, live mirroring of creates and
//! deletes, and a query surface that fills in schema-derived defaults.
//!
//! ## Architecture
//!
//! - [`schema`] — pure field-set validation against a source's schema
//! - [`source`] — the [`DataSource`] seam plus record and change-event types
//! - [`remote`] — the [`SearchClient`] seam, the async task model, and the
//!   completion poller
//! - [`document`] — record-to-document serialization in schema order
//! - [`registry`] — validated declarations, addressable by name or label
//! - [`index`] — lifecycle (create/destroy/clean) and batch population
//! - [`change_sync`] — broadcast-driven live propagation
//! - [`query`] — option normalization and uniform search outcomes
//! - [`engine`] — the [`SearchSync`] facade tying it all together
//!
//! Every mutating remote call returns a [`TaskHandle`]; blocking variants
//! poll it to a terminal state with capped exponential backoff, `_detached`
//! variants return at submission time.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use searchsync::{
//!     FieldType, IndexDeclaration, MemoryBackend, MemorySource, Record, SearchOptions,
//!     SearchSync, SearchSyncConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(MemorySource::new(
//!     "blog",
//!     "Post",
//!     vec![
//!         ("id".to_string(), FieldType::Int),
//!         ("title".to_string(), FieldType::Text),
//!     ],
//!     "id",
//! ));
//! source.insert(Record::new().with("id", 1i64).with("title", "hello"));
//!
//! let engine = SearchSync::new(Arc::new(MemoryBackend::new()), SearchSyncConfig::default());
//! engine.register(
//!     IndexDeclaration::new("posts", "PostIndex", source).searchable(["title"]),
//! )?;
//!
//! engine.create("posts").await?;
//! engine.populate("posts").await?;
//! let (results, _outcome) = engine.search("posts", "hello", SearchOptions::new()).await?;
//! assert_eq!(results.hits.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod change_sync;
pub mod config;
pub mod document;
pub mod engine;
pub mod index;
pub mod metrics;
pub mod query;
pub mod registry;
pub mod remote;
pub mod schema;
pub mod source;

pub use change_sync::ChangeSync;
pub use config::SearchSyncConfig;
pub use document::{DocumentMapper, TimestampMode};
pub use engine::{EngineError, SearchSync};
pub use index::{CleanReport, CreateOutcome, IndexOps, PopulateError};
pub use query::{SearchOptions, SearchOutcome};
pub use registry::{IndexDeclaration, IndexDefinition, IndexRegistry};
pub use remote::{
    indexed_total, received_total, Document, IndexMetadata, IndexStats, MemoryBackend, PollConfig,
    RemoteError, SearchClient, SearchResults, TaskHandle, TaskStatus,
};
pub use schema::{ConfigError, FieldKind, FieldSpec};
pub use source::{DataSource, FieldType, FieldValue, MemorySource, Record, RecordEvent, SourceError};
