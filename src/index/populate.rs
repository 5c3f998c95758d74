//! Batch population.
//!
//! Fills a remote index from the entire backing dataset in fixed-size
//! chunks. Attribute configuration is pushed first (a full replace each
//! call), then the dataset is paged in ascending offset order and each page
//! submitted as one bulk upsert.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::registry::IndexDefinition;
use crate::remote::{await_completion, RemoteError, TaskHandle};
use crate::source::SourceError;

use super::IndexOps;

/// Errors from batch population: either side of the pipe can fail.
#[derive(Error, Debug)]
pub enum PopulateError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl IndexOps {
    /// Populate the index from the full backing dataset, one chunk at a time.
    ///
    /// Chunks are strictly sequential: chunk N+1 is not submitted until
    /// chunk N's task reached a terminal state. A failed chunk is recorded
    /// in the returned list and does not abort later chunks; already-applied
    /// chunks are never rolled back. Callers sum
    /// [`indexed_total`](crate::remote::indexed_total) over the result.
    pub async fn populate(&self, def: &IndexDefinition) -> Result<Vec<TaskHandle>, PopulateError> {
        self.configure_attributes(def).await?;

        let total = def.source.count().await?;
        let mut tasks = Vec::new();
        let mut offset = 0u64;
        while offset < total {
            let records = def.source.fetch(offset, def.batch_size).await?;
            if records.is_empty() {
                break;
            }
            let documents = def.mapper.serialize_all(&records);
            metrics::record_populate_chunk(&def.name, documents.len());
            let submitted = self
                .client
                .add_documents(&def.name, documents, &def.primary_key_field)
                .await?;
            let task = await_completion(&*self.client, submitted.id, &self.poll).await?;
            if task.failed() {
                warn!(
                    index = %def.name,
                    offset,
                    details = ?task.details,
                    "Population chunk failed"
                );
            } else {
                debug!(index = %def.name, offset, task_id = task.id, "Population chunk indexed");
            }
            tasks.push(task);
            offset += def.batch_size as u64;
        }

        info!(index = %def.name, chunks = tasks.len(), total, "Index populated");
        Ok(tasks)
    }

    /// Submit all population chunks without waiting for any of them.
    ///
    /// Chunks are issued in ascending offset order, but nothing is implied
    /// about remote-side completion order. The returned handles are at their
    /// submission-time state; callers sum
    /// [`received_total`](crate::remote::received_total) for a total.
    pub async fn populate_detached(
        &self,
        def: &IndexDefinition,
    ) -> Result<Vec<TaskHandle>, PopulateError> {
        self.configure_attributes(def).await?;

        let total = def.source.count().await?;
        let mut tasks = Vec::new();
        let mut offset = 0u64;
        while offset < total {
            let records = def.source.fetch(offset, def.batch_size).await?;
            if records.is_empty() {
                break;
            }
            let documents = def.mapper.serialize_all(&records);
            metrics::record_populate_chunk(&def.name, documents.len());
            let task = self
                .client
                .add_documents(&def.name, documents, &def.primary_key_field)
                .await?;
            debug!(index = %def.name, offset, task_id = task.id, "Population chunk submitted");
            tasks.push(task);
            offset += def.batch_size as u64;
        }

        info!(index = %def.name, chunks = tasks.len(), total, "Index population submitted");
        Ok(tasks)
    }

    /// Wipe and repopulate in one call.
    pub async fn rebuild(&self, def: &IndexDefinition) -> Result<Vec<TaskHandle>, PopulateError> {
        self.clean(def).await?;
        self.populate(def).await
    }

    /// Push the definition's attribute configuration to the remote index.
    /// Idempotent full replace.
    async fn configure_attributes(&self, def: &IndexDefinition) -> Result<(), RemoteError> {
        self.client
            .update_filterable_attributes(&def.name, &def.filterable_fields)
            .await?;
        self.client
            .update_searchable_attributes(&def.name, &def.searchable_fields)
            .await?;
        self.client
            .update_sortable_attributes(&def.name, &def.sortable_fields)
            .await?;
        Ok(())
    }
}
