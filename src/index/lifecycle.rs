//! Index lifecycle: create, destroy, clean.

use tracing::{debug, info, warn};

use crate::metrics;
use crate::registry::IndexDefinition;
use crate::remote::{await_completion, RemoteError, TaskHandle};

use super::IndexOps;

/// Result of a create call.
///
/// "Already exists" is reported, not raised: whether that is an error is the
/// caller's decision.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(TaskHandle),
    AlreadyExists,
}

/// Result of a clean call. `documents_cleaned` is the remote document count
/// captured strictly before the delete-all request was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanReport {
    pub documents_cleaned: u64,
    pub task: TaskHandle,
}

impl IndexOps {
    /// Whether an index with the definition's name exists remotely.
    pub async fn exists(&self, def: &IndexDefinition) -> Result<bool, RemoteError> {
        match self.client.get_index(&def.name).await {
            Ok(_) => Ok(true),
            Err(RemoteError::IndexNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remote document count for the definition's index.
    pub async fn document_count(&self, def: &IndexDefinition) -> Result<u64, RemoteError> {
        Ok(self.client.index_stats(&def.name).await?.document_count)
    }

    /// Create the index and wait for the creation task to finish.
    ///
    /// A no-op when the index already exists remotely.
    pub async fn create(&self, def: &IndexDefinition) -> Result<CreateOutcome, RemoteError> {
        match self.create_detached(def).await? {
            CreateOutcome::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
            CreateOutcome::Created(task) => {
                let task = await_completion(&*self.client, task.id, &self.poll).await?;
                let status = if task.failed() { "failed" } else { "success" };
                metrics::record_index_operation("create", status);
                if task.failed() {
                    warn!(index = %def.name, details = ?task.details, "Index creation failed");
                } else {
                    info!(index = %def.name, "Index created");
                }
                Ok(CreateOutcome::Created(task))
            }
        }
    }

    /// Submit index creation without waiting for completion.
    pub async fn create_detached(&self, def: &IndexDefinition) -> Result<CreateOutcome, RemoteError> {
        if self.exists(def).await? {
            debug!(index = %def.name, "Index already exists, create is a no-op");
            metrics::record_index_operation("create", "already_exists");
            return Ok(CreateOutcome::AlreadyExists);
        }
        let task = self
            .client
            .create_index(&def.name, &def.primary_key_field)
            .await?;
        debug!(index = %def.name, task_id = task.id, "Index creation submitted");
        Ok(CreateOutcome::Created(task))
    }

    /// Delete the index and wait for the deletion task to finish. Failed
    /// tasks are reported through the returned handle's details.
    pub async fn destroy(&self, def: &IndexDefinition) -> Result<TaskHandle, RemoteError> {
        let submitted = self.destroy_detached(def).await?;
        let task = await_completion(&*self.client, submitted.id, &self.poll).await?;
        let status = if task.failed() { "failed" } else { "success" };
        metrics::record_index_operation("destroy", status);
        if task.failed() {
            warn!(index = %def.name, details = ?task.details, "Index destruction failed");
        } else {
            info!(index = %def.name, "Index destroyed");
        }
        Ok(task)
    }

    /// Submit index deletion without waiting for completion.
    pub async fn destroy_detached(&self, def: &IndexDefinition) -> Result<TaskHandle, RemoteError> {
        let task = self.client.delete_index(&def.name).await?;
        debug!(index = %def.name, task_id = task.id, "Index deletion submitted");
        Ok(task)
    }

    /// Delete all documents, waiting for the task, and report how many
    /// documents the index held before the deletion.
    pub async fn clean(&self, def: &IndexDefinition) -> Result<CleanReport, RemoteError> {
        let report = self.clean_detached(def).await?;
        let task = await_completion(&*self.client, report.task.id, &self.poll).await?;
        let status = if task.failed() { "failed" } else { "success" };
        metrics::record_index_operation("clean", status);
        info!(
            index = %def.name,
            documents = report.documents_cleaned,
            "Index cleaned"
        );
        Ok(CleanReport {
            documents_cleaned: report.documents_cleaned,
            task,
        })
    }

    /// Submit a delete-all-documents request without waiting.
    ///
    /// The count must be read before the deletion is issued; reading it
    /// afterward would race the remote task and report zero.
    pub async fn clean_detached(&self, def: &IndexDefinition) -> Result<CleanReport, RemoteError> {
        let documents_cleaned = self.document_count(def).await?;
        let task = self.client.delete_all_documents(&def.name).await?;
        debug!(index = %def.name, task_id = task.id, "Delete-all submitted");
        Ok(CleanReport {
            documents_cleaned,
            task,
        })
    }
}
