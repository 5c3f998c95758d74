// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backing data source interface.
//!
//! The sync engine treats the relational layer as an external collaborator
//! reached through the [`DataSource`] trait: field metadata for validation,
//! count + paged retrieval for batch population, and a broadcast stream of
//! record-level create/delete events for live change sync.

mod memory;
mod record;
mod traits;

pub use memory::MemorySource;
pub use record::{FieldValue, Record, RecordEvent};
pub use traits::{DataSource, FieldType, SourceError};
