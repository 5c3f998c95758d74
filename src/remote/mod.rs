// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote search service interface.
//!
//! The remote service is reached through the [`SearchClient`] trait; the
//! engine never sees transport details. Mutating calls hand back a
//! [`TaskHandle`] because the service applies them asynchronously — the
//! [`poller`] turns a task id into a terminal state when a caller needs to
//! block.

pub mod memory;
pub mod poller;
pub mod task;
pub mod traits;

pub use memory::MemoryBackend;
pub use poller::{await_completion, current_state, PollConfig};
pub use task::{indexed_total, received_total, TaskDetails, TaskHandle, TaskKind, TaskStatus};
pub use traits::{
    Document, IndexMetadata, IndexStats, RemoteError, SearchClient, SearchResults,
};
