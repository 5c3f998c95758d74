use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::task::TaskHandle;

/// Errors surfaced by the remote search service client.
///
/// These are call-time errors, recoverable by the caller; they are distinct
/// from the configuration errors raised at registration time.
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    #[error("index not found: {name}")]
    IndexNotFound { name: String },

    #[error("index already exists: {name}")]
    IndexAlreadyExists { name: String },

    #[error("task not found: {id}")]
    TaskNotFound { id: u64 },

    /// A remote-side API error carrying an HTTP-like status code and an
    /// error code/message payload.
    #[error("remote api error ({code}): {message}")]
    Api {
        status_code: Option<u16>,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// HTTP-like status code of the error, when the remote reported one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RemoteError::IndexNotFound { .. } => Some(404),
            RemoteError::IndexAlreadyExists { .. } => Some(409),
            RemoteError::TaskNotFound { .. } => Some(404),
            RemoteError::Api { status_code, .. } => *status_code,
            RemoteError::Transport(_) => None,
        }
    }
}

/// Remote index metadata, as returned by the get-index probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

/// Remote index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub document_count: u64,
    pub is_indexing: bool,
}

/// One serialized record as sent to / received from the remote service.
pub type Document = Map<String, Value>;

/// A search response from the remote service.
///
/// Paging metadata comes in two flavors depending on the options used:
/// `offset`/`limit`/`estimated_total_hits` for plain paging, and
/// `page`/`hits_per_page`/`total_pages`/`total_hits` for exhaustive paging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResults {
    pub hits: Vec<Document>,
    pub query: String,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_total_hits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_hits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_distribution: Option<Value>,
    /// Error detail attached by the query normalizer on remote failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client for the remote search service.
///
/// This is the transport boundary: implementations own HTTP/JSON plumbing,
/// the engine owns everything above it. All mutating calls return a
/// [`TaskHandle`] at its state as of submission; callers decide whether to
/// poll it to a terminal state.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn create_index(
        &self,
        name: &str,
        primary_key: &str,
    ) -> Result<TaskHandle, RemoteError>;

    async fn delete_index(&self, name: &str) -> Result<TaskHandle, RemoteError>;

    async fn get_index(&self, name: &str) -> Result<IndexMetadata, RemoteError>;

    async fn update_searchable_attributes(
        &self,
        name: &str,
        fields: &[String],
    ) -> Result<TaskHandle, RemoteError>;

    async fn update_filterable_attributes(
        &self,
        name: &str,
        fields: &[String],
    ) -> Result<TaskHandle, RemoteError>;

    async fn update_sortable_attributes(
        &self,
        name: &str,
        fields: &[String],
    ) -> Result<TaskHandle, RemoteError>;

    /// Bulk upsert keyed by `primary_key`. Existing documents with the same
    /// key are replaced.
    async fn add_documents(
        &self,
        name: &str,
        documents: Vec<Document>,
        primary_key: &str,
    ) -> Result<TaskHandle, RemoteError>;

    async fn delete_document(&self, name: &str, id: &str) -> Result<TaskHandle, RemoteError>;

    async fn delete_all_documents(&self, name: &str) -> Result<TaskHandle, RemoteError>;

    async fn get_task(&self, id: u64) -> Result<TaskHandle, RemoteError>;

    async fn index_stats(&self, name: &str) -> Result<IndexStats, RemoteError>;

    /// Search with remote-shaped (camelCase-keyed) options.
    async fn search(
        &self,
        name: &str,
        term: &str,
        options: &Map<String, Value>,
    ) -> Result<SearchResults, RemoteError>;
}
