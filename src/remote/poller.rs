// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Task completion polling.
//!
//! Turns "submit and get a task id" into "submit and wait for a terminal
//! state". The poll loop backs off exponentially between fetches so the
//! remote service is never busy-spun; there is no built-in upper bound on
//! total wait, so callers that need one wrap the future in their own
//! timeout (`tokio::time::timeout`).

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::task::TaskHandle;
use super::traits::{RemoteError, SearchClient};

/// Poll interval configuration with exponential backoff.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub factor: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(1),
            factor: 2.0,
        }
    }
}

impl PollConfig {
    /// Minimal delays for tests.
    pub fn fast() -> Self {
        Self {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            factor: 2.0,
        }
    }
}

/// Fetch the task once and return it at its current, possibly non-terminal,
/// state. The non-blocking sibling of [`await_completion`].
pub async fn current_state(
    client: &dyn SearchClient,
    task_id: u64,
) -> Result<TaskHandle, RemoteError> {
    client.get_task(task_id).await
}

/// Smallest interval the loop will ever sleep. A zero interval would turn
/// the poll into a busy spin against the remote service.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Poll the task until it reaches `succeeded` or `failed`.
///
/// The interval between polls starts at `config.initial_interval` and grows
/// by `config.factor` up to `config.max_interval`. Intervals are clamped to
/// [`MIN_POLL_INTERVAL`], so a zero or sub-millisecond configuration still
/// yields between fetches.
pub async fn await_completion(
    client: &dyn SearchClient,
    task_id: u64,
    config: &PollConfig,
) -> Result<TaskHandle, RemoteError> {
    let cap = config.max_interval.max(MIN_POLL_INTERVAL);
    let mut interval = config.initial_interval.clamp(MIN_POLL_INTERVAL, cap);
    let mut polls = 0u32;

    loop {
        let task = client.get_task(task_id).await?;
        if task.is_terminal() {
            if task.failed() {
                warn!(task_id, details = ?task.details, "Remote task failed");
            } else {
                debug!(task_id, polls, "Remote task completed");
            }
            return Ok(task);
        }

        polls += 1;
        sleep(interval).await;
        interval = interval.mul_f64(config.factor).clamp(MIN_POLL_INTERVAL, cap);
    }
}
