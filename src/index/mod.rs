// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index operations against the remote service.
//!
//! [`IndexOps`] drives the remote side of a registered definition: lifecycle
//! (create/destroy/clean) and batch population. Every mutating operation has
//! two variants following the remote task model:
//!
//! - a blocking one that polls the submitted task to a terminal state, and
//! - a `_detached` one that returns right after submission with the task at
//!   its current (possibly non-terminal) state.

mod lifecycle;
mod populate;

pub use lifecycle::{CleanReport, CreateOutcome};
pub use populate::PopulateError;

use std::sync::Arc;

use crate::remote::{PollConfig, SearchClient};

/// Lifecycle manager and batch populator for registered indexes.
pub struct IndexOps {
    pub(crate) client: Arc<dyn SearchClient>,
    pub(crate) poll: PollConfig,
}

impl IndexOps {
    pub fn new(client: Arc<dyn SearchClient>, poll: PollConfig) -> Self {
        Self { client, poll }
    }
}
