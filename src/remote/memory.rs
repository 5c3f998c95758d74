//! In-memory search backend.
//!
//! A naive but functional [`SearchClient`] used by tests and demos. It keeps
//! per-index document stores and attribute settings, matches search terms by
//! case-insensitive substring over the searchable attributes, and models the
//! remote task table including non-terminal states: with a configured poll
//! lag, tasks report `enqueued`/`processing` for the first N `get_task`
//! fetches before turning terminal, which is what exercises the poller.
//!
//! Not a search engine: no ranking, no tokenization, no filter expressions.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::task::{TaskDetails, TaskHandle, TaskKind, TaskStatus};
use super::traits::{Document, IndexMetadata, IndexStats, RemoteError, SearchClient, SearchResults};

const DEFAULT_SEARCH_LIMIT: u64 = 20;
const DEFAULT_HITS_PER_PAGE: u64 = 20;

#[derive(Debug, Default)]
struct MemoryIndex {
    primary_key: Option<String>,
    /// Documents in insertion order, keyed by primary-key value.
    documents: Vec<(String, Document)>,
    searchable: Vec<String>,
    filterable: Vec<String>,
    sortable: Vec<String>,
}

impl MemoryIndex {
    fn new(primary_key: Option<String>) -> Self {
        Self {
            primary_key,
            documents: Vec::new(),
            // The remote default: every field is searchable.
            searchable: vec!["*".to_string()],
            filterable: Vec::new(),
            sortable: Vec::new(),
        }
    }

    fn upsert(&mut self, key: String, doc: Document) {
        match self.documents.iter().position(|(k, _)| *k == key) {
            Some(pos) => self.documents[pos] = (key, doc),
            None => self.documents.push((key, doc)),
        }
    }
}

struct TaskState {
    /// The task at its terminal state.
    terminal: TaskHandle,
    /// get_task fetches remaining before the terminal state is reported.
    remaining_polls: u32,
}

pub struct MemoryBackend {
    indexes: DashMap<String, Mutex<MemoryIndex>>,
    tasks: DashMap<u64, Mutex<TaskState>>,
    next_task_id: AtomicU64,
    poll_lag: u32,
    fail_next: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            indexes: DashMap::new(),
            tasks: DashMap::new(),
            next_task_id: AtomicU64::new(0),
            poll_lag: 0,
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make every task stay non-terminal for the first `lag` `get_task`
    /// fetches. With the default of 0, tasks are terminal immediately.
    pub fn with_poll_lag(mut self, lag: u32) -> Self {
        self.poll_lag = lag;
        self
    }

    /// Make the next mutating operation produce a `failed` task and skip its
    /// effect. One-shot.
    pub fn fail_next_operation(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn spawn_task(&self, kind: TaskKind, details: TaskDetails, failed: bool) -> TaskHandle {
        let id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        let status = if failed {
            TaskStatus::Failed
        } else {
            TaskStatus::Succeeded
        };
        let terminal = TaskHandle {
            id,
            status,
            kind,
            details,
        };
        self.tasks.insert(
            id,
            Mutex::new(TaskState {
                terminal: terminal.clone(),
                remaining_polls: self.poll_lag,
            }),
        );
        // The handle returned at submission reflects the current state.
        if self.poll_lag > 0 {
            TaskHandle {
                status: TaskStatus::Enqueued,
                details: TaskDetails {
                    received_documents: terminal.details.received_documents,
                    ..Default::default()
                },
                ..terminal
            }
        } else {
            terminal
        }
    }

    fn take_fail_flag(&self) -> bool {
        self.fail_next.swap(false, Ordering::SeqCst)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn document_key(doc: &Document, primary_key: &str) -> Option<String> {
    match doc.get(primary_key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_term(doc: &Document, term: &str, attrs: &[String]) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    let all_fields = attrs.iter().any(|a| a == "*");
    doc.iter()
        .filter(|(name, _)| all_fields || attrs.iter().any(|a| a == *name))
        .any(|(_, value)| value_text(value).to_lowercase().contains(&needle))
}

fn opt_u64(options: &Map<String, Value>, key: &str) -> Option<u64> {
    options.get(key).and_then(Value::as_u64)
}

fn opt_string_list(options: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    options.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect()
    })
}

fn apply_sort(hits: &mut [Document], sort: &[String]) {
    // Only the first sort expression is honored; enough for a test backend.
    let Some(expr) = sort.first() else { return };
    let (field, descending) = match expr.rsplit_once(':') {
        Some((f, "desc")) => (f, true),
        Some((f, _)) => (f, false),
        None => (expr.as_str(), false),
    };
    hits.sort_by(|a, b| {
        let av = a.get(field);
        let bv = b.get(field);
        let ord = match (av.and_then(Value::as_f64), bv.and_then(Value::as_f64)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            _ => value_text(av.unwrap_or(&Value::Null)).cmp(&value_text(bv.unwrap_or(&Value::Null))),
        };
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

fn project(doc: &Document, retrieve: Option<&[String]>) -> Document {
    match retrieve {
        None => doc.clone(),
        Some(attrs) if attrs.iter().any(|a| a == "*") => doc.clone(),
        Some(attrs) => doc
            .iter()
            .filter(|(name, _)| attrs.iter().any(|a| a == *name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

#[async_trait]
impl SearchClient for MemoryBackend {
    async fn create_index(&self, name: &str, primary_key: &str) -> Result<TaskHandle, RemoteError> {
        if self.indexes.contains_key(name) {
            return Err(RemoteError::IndexAlreadyExists { name: name.to_string() });
        }
        if self.take_fail_flag() {
            return Ok(self.spawn_task(
                TaskKind::IndexCreation,
                TaskDetails { error: Some("injected failure".into()), ..Default::default() },
                true,
            ));
        }
        self.indexes.insert(
            name.to_string(),
            Mutex::new(MemoryIndex::new(Some(primary_key.to_string()))),
        );
        Ok(self.spawn_task(TaskKind::IndexCreation, TaskDetails::default(), false))
    }

    async fn delete_index(&self, name: &str) -> Result<TaskHandle, RemoteError> {
        if self.indexes.remove(name).is_none() {
            return Err(RemoteError::IndexNotFound { name: name.to_string() });
        }
        Ok(self.spawn_task(TaskKind::IndexDeletion, TaskDetails::default(), false))
    }

    async fn get_index(&self, name: &str) -> Result<IndexMetadata, RemoteError> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        let primary_key = index.lock().primary_key.clone();
        Ok(IndexMetadata { uid: name.to_string(), primary_key })
    }

    async fn update_searchable_attributes(
        &self,
        name: &str,
        fields: &[String],
    ) -> Result<TaskHandle, RemoteError> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        index.lock().searchable = fields.to_vec();
        Ok(self.spawn_task(TaskKind::AttributeUpdate, TaskDetails::default(), false))
    }

    async fn update_filterable_attributes(
        &self,
        name: &str,
        fields: &[String],
    ) -> Result<TaskHandle, RemoteError> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        index.lock().filterable = fields.to_vec();
        Ok(self.spawn_task(TaskKind::AttributeUpdate, TaskDetails::default(), false))
    }

    async fn update_sortable_attributes(
        &self,
        name: &str,
        fields: &[String],
    ) -> Result<TaskHandle, RemoteError> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        index.lock().sortable = fields.to_vec();
        Ok(self.spawn_task(TaskKind::AttributeUpdate, TaskDetails::default(), false))
    }

    async fn add_documents(
        &self,
        name: &str,
        documents: Vec<Document>,
        primary_key: &str,
    ) -> Result<TaskHandle, RemoteError> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        let received = documents.len() as u64;

        if self.take_fail_flag() {
            return Ok(self.spawn_task(
                TaskKind::DocumentAddition,
                TaskDetails {
                    received_documents: Some(received),
                    error: Some("injected failure".into()),
                    ..Default::default()
                },
                true,
            ));
        }

        let mut guard = index.lock();
        if guard.primary_key.is_none() {
            guard.primary_key = Some(primary_key.to_string());
        }
        for doc in documents {
            let Some(key) = document_key(&doc, primary_key) else {
                return Ok(self.spawn_task(
                    TaskKind::DocumentAddition,
                    TaskDetails {
                        received_documents: Some(received),
                        error: Some(format!("document missing primary key {primary_key:?}")),
                        ..Default::default()
                    },
                    true,
                ));
            };
            guard.upsert(key, doc);
        }
        drop(guard);

        Ok(self.spawn_task(
            TaskKind::DocumentAddition,
            TaskDetails {
                received_documents: Some(received),
                indexed_documents: Some(received),
                ..Default::default()
            },
            false,
        ))
    }

    async fn delete_document(&self, name: &str, id: &str) -> Result<TaskHandle, RemoteError> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        let deleted = {
            let mut guard = index.lock();
            match guard.documents.iter().position(|(k, _)| k == id) {
                Some(pos) => {
                    guard.documents.remove(pos);
                    1
                }
                None => 0,
            }
        };
        Ok(self.spawn_task(
            TaskKind::DocumentDeletion,
            TaskDetails { deleted_documents: Some(deleted), ..Default::default() },
            false,
        ))
    }

    async fn delete_all_documents(&self, name: &str) -> Result<TaskHandle, RemoteError> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        let deleted = {
            let mut guard = index.lock();
            let count = guard.documents.len() as u64;
            guard.documents.clear();
            count
        };
        Ok(self.spawn_task(
            TaskKind::DocumentDeletion,
            TaskDetails { deleted_documents: Some(deleted), ..Default::default() },
            false,
        ))
    }

    async fn get_task(&self, id: u64) -> Result<TaskHandle, RemoteError> {
        let state = self
            .tasks
            .get(&id)
            .ok_or(RemoteError::TaskNotFound { id })?;
        let mut guard = state.lock();
        if guard.remaining_polls == 0 {
            return Ok(guard.terminal.clone());
        }
        let status = if guard.remaining_polls == self.poll_lag {
            TaskStatus::Enqueued
        } else {
            TaskStatus::Processing
        };
        guard.remaining_polls -= 1;
        Ok(TaskHandle {
            status,
            details: TaskDetails {
                received_documents: guard.terminal.details.received_documents,
                ..Default::default()
            },
            ..guard.terminal.clone()
        })
    }

    async fn index_stats(&self, name: &str) -> Result<IndexStats, RemoteError> {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        let document_count = index.lock().documents.len() as u64;
        Ok(IndexStats { document_count, is_indexing: false })
    }

    async fn search(
        &self,
        name: &str,
        term: &str,
        options: &Map<String, Value>,
    ) -> Result<SearchResults, RemoteError> {
        let started = std::time::Instant::now();
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| RemoteError::IndexNotFound { name: name.to_string() })?;
        let guard = index.lock();

        let search_attrs = opt_string_list(options, "attributesToSearchOn")
            .unwrap_or_else(|| guard.searchable.clone());
        let retrieve = opt_string_list(options, "attributesToRetrieve");

        let mut matched: Vec<Document> = guard
            .documents
            .iter()
            .filter(|(_, doc)| matches_term(doc, term, &search_attrs))
            .map(|(_, doc)| doc.clone())
            .collect();
        drop(guard);

        if let Some(sort) = opt_string_list(options, "sort") {
            apply_sort(&mut matched, &sort);
        }

        let total = matched.len() as u64;
        let mut results = SearchResults {
            query: term.to_string(),
            ..Default::default()
        };

        let exhaustive =
            options.contains_key("hitsPerPage") || options.contains_key("page");
        let (start, end) = if exhaustive {
            let hits_per_page = opt_u64(options, "hitsPerPage").unwrap_or(DEFAULT_HITS_PER_PAGE);
            let page = opt_u64(options, "page").unwrap_or(1).max(1);
            let total_pages = if hits_per_page == 0 {
                0
            } else {
                total.div_ceil(hits_per_page)
            };
            results.page = Some(page);
            results.hits_per_page = Some(hits_per_page);
            results.total_pages = Some(total_pages);
            results.total_hits = Some(total);
            let start = (page - 1).saturating_mul(hits_per_page);
            (start, start.saturating_add(hits_per_page))
        } else {
            let offset = opt_u64(options, "offset").unwrap_or(0);
            let limit = opt_u64(options, "limit").unwrap_or(DEFAULT_SEARCH_LIMIT);
            results.offset = Some(offset);
            results.limit = Some(limit);
            results.estimated_total_hits = Some(total);
            (offset, offset.saturating_add(limit))
        };

        let start = start.min(total) as usize;
        let end = end.min(total) as usize;
        results.hits = matched[start..end]
            .iter()
            .map(|doc| project(doc, retrieve.as_deref()))
            .collect();
        results.processing_time_ms = started.elapsed().as_millis() as u64;

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: u64, title: &str, body: &str) -> Document {
        let Value::Object(map) = json!({"id": id, "title": title, "body": body}) else {
            unreachable!()
        };
        map
    }

    async fn seeded_backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.create_index("posts", "id").await.unwrap();
        backend
            .add_documents(
                "posts",
                vec![
                    doc(1, "alpha", "itaque rerum"),
                    doc(2, "beta", "voluptas"),
                    doc(3, "gamma", "itaque quod"),
                    doc(4, "delta", "itaque sit"),
                ],
                "id",
            )
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_create_then_get_index() {
        let backend = MemoryBackend::new();
        backend.create_index("posts", "id").await.unwrap();

        let meta = backend.get_index("posts").await.unwrap();
        assert_eq!(meta.uid, "posts");
        assert_eq!(meta.primary_key.as_deref(), Some("id"));

        let err = backend.create_index("posts", "id").await.unwrap_err();
        assert!(matches!(err, RemoteError::IndexAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_get_missing_index_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get_index("ghost").await.unwrap_err();
        assert!(matches!(err, RemoteError::IndexNotFound { .. }));
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn test_add_documents_upserts_by_key() {
        let backend = seeded_backend().await;
        backend
            .add_documents("posts", vec![doc(1, "alpha-v2", "rewritten")], "id")
            .await
            .unwrap();

        let stats = backend.index_stats("posts").await.unwrap();
        assert_eq!(stats.document_count, 4);
    }

    #[tokio::test]
    async fn test_search_substring_and_total() {
        let backend = seeded_backend().await;
        let results = backend.search("posts", "itaque", &Map::new()).await.unwrap();
        assert_eq!(results.hits.len(), 3);
        assert_eq!(results.estimated_total_hits, Some(3));
        assert_eq!(results.offset, Some(0));
        assert_eq!(results.limit, Some(20));
    }

    #[tokio::test]
    async fn test_search_offset_limit() {
        let backend = seeded_backend().await;
        let mut opts = Map::new();
        opts.insert("limit".into(), json!(2));
        opts.insert("offset".into(), json!(2));
        let results = backend.search("posts", "itaque", &opts).await.unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.estimated_total_hits, Some(3));
    }

    #[tokio::test]
    async fn test_search_exhaustive_paging() {
        let backend = seeded_backend().await;
        let mut opts = Map::new();
        opts.insert("hitsPerPage".into(), json!(2));
        opts.insert("page".into(), json!(2));
        let results = backend.search("posts", "itaque", &opts).await.unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.total_hits, Some(3));
        assert_eq!(results.total_pages, Some(2));
        assert_eq!(results.page, Some(2));
    }

    #[tokio::test]
    async fn test_search_huge_page_values_do_not_overflow() {
        let backend = seeded_backend().await;
        let mut opts = Map::new();
        opts.insert("hitsPerPage".into(), json!(u64::MAX));
        opts.insert("page".into(), json!(u64::MAX));
        let results = backend.search("posts", "itaque", &opts).await.unwrap();
        assert!(results.hits.is_empty());
        assert_eq!(results.total_hits, Some(3));
    }

    #[tokio::test]
    async fn test_search_restricted_attributes() {
        let backend = seeded_backend().await;
        let mut opts = Map::new();
        opts.insert("attributesToSearchOn".into(), json!(["title"]));
        let results = backend.search("posts", "itaque", &opts).await.unwrap();
        assert!(results.hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_projection() {
        let backend = seeded_backend().await;
        let mut opts = Map::new();
        opts.insert("attributesToRetrieve".into(), json!(["id"]));
        let results = backend.search("posts", "itaque", &opts).await.unwrap();
        for hit in &results.hits {
            assert!(hit.contains_key("id"));
            assert!(!hit.contains_key("title"));
        }
    }

    #[tokio::test]
    async fn test_search_sort_desc() {
        let backend = seeded_backend().await;
        let mut opts = Map::new();
        opts.insert("sort".into(), json!(["id:desc"]));
        let results = backend.search("posts", "itaque", &opts).await.unwrap();
        let ids: Vec<u64> = results
            .hits
            .iter()
            .map(|h| h.get("id").and_then(Value::as_u64).unwrap())
            .collect();
        assert_eq!(ids, vec![4, 3, 1]);
    }

    #[tokio::test]
    async fn test_delete_document_and_delete_all() {
        let backend = seeded_backend().await;

        let task = backend.delete_document("posts", "2").await.unwrap();
        assert_eq!(task.details.deleted_documents, Some(1));

        let task = backend.delete_all_documents("posts").await.unwrap();
        assert_eq!(task.details.deleted_documents, Some(3));
        assert_eq!(backend.index_stats("posts").await.unwrap().document_count, 0);
    }

    #[tokio::test]
    async fn test_missing_primary_key_fails_task() {
        let backend = MemoryBackend::new();
        backend.create_index("posts", "id").await.unwrap();

        let mut bad = Map::new();
        bad.insert("title".into(), json!("no id here"));
        let task = backend.add_documents("posts", vec![bad], "id").await.unwrap();
        assert!(task.failed());
        assert!(task.details.error.as_deref().unwrap().contains("primary key"));
    }

    #[tokio::test]
    async fn test_fail_injection_skips_effect() {
        let backend = seeded_backend().await;
        backend.fail_next_operation();

        let task = backend
            .add_documents("posts", vec![doc(9, "nine", "ninth")], "id")
            .await
            .unwrap();
        assert!(task.failed());
        assert_eq!(backend.index_stats("posts").await.unwrap().document_count, 4);
    }

    #[tokio::test]
    async fn test_poll_lag_progression() {
        let backend = MemoryBackend::new().with_poll_lag(2);
        let submitted = backend.create_index("posts", "id").await.unwrap();
        assert_eq!(submitted.status, TaskStatus::Enqueued);

        assert_eq!(backend.get_task(submitted.id).await.unwrap().status, TaskStatus::Enqueued);
        assert_eq!(backend.get_task(submitted.id).await.unwrap().status, TaskStatus::Processing);
        assert_eq!(backend.get_task(submitted.id).await.unwrap().status, TaskStatus::Succeeded);
        // Terminal states never revert.
        assert_eq!(backend.get_task(submitted.id).await.unwrap().status, TaskStatus::Succeeded);
    }
}
