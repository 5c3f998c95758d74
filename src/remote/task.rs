//! Remote task model.
//!
//! Every mutating operation on the remote search service is asynchronous:
//! submission returns a task id, and the task moves through
//! `Enqueued → Processing → Succeeded | Failed`. Terminal states never revert.

use serde::{Deserialize, Serialize};

/// Status of a remote task. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Enqueued => "enqueued",
            TaskStatus::Processing => "processing",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What kind of operation the task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    IndexCreation,
    IndexDeletion,
    DocumentAddition,
    DocumentDeletion,
    AttributeUpdate,
}

/// Operation-specific payload reported by the remote service.
///
/// `received_documents` is known at submission time; `indexed_documents` and
/// `deleted_documents` only once the task reaches a terminal state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_documents: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_documents: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_documents: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A remote task at some observed point in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHandle {
    pub id: u64,
    pub status: TaskStatus,
    pub kind: TaskKind,
    pub details: TaskDetails,
}

impl TaskHandle {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }
}

/// Sum of `indexed_documents` across a batch of task handles.
///
/// This is the completion-side total: meaningful once the tasks are terminal.
pub fn indexed_total(tasks: &[TaskHandle]) -> u64 {
    tasks
        .iter()
        .filter_map(|t| t.details.indexed_documents)
        .sum()
}

/// Sum of `received_documents` across a batch of task handles.
///
/// The submission-side total: available immediately, before completion.
pub fn received_total(tasks: &[TaskHandle]) -> u64 {
    tasks
        .iter()
        .filter_map(|t| t.details.received_documents)
        .sum()
}
