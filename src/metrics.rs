// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for searchsync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `searchsync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: create, destroy, clean, populate, upsert, delete, search
//! - `status`: success, failed, error

use metrics::{counter, histogram};
use std::time::Duration;

/// Record an index lifecycle operation (create/destroy/clean).
pub fn record_index_operation(operation: &str, status: &str) {
    counter!(
        "searchsync_index_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record one submitted population chunk and its size.
pub fn record_populate_chunk(index: &str, documents: usize) {
    counter!(
        "searchsync_populate_chunks_total",
        "index" => index.to_string()
    )
    .increment(1);
    histogram!(
        "searchsync_populate_chunk_size",
        "index" => index.to_string()
    )
    .record(documents as f64);
}

/// Record a change-sync event dispatch.
pub fn record_change_event(operation: &str, status: &str) {
    counter!(
        "searchsync_change_events_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a search call outcome.
pub fn record_search(status: &str) {
    counter!(
        "searchsync_search_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search latency.
pub fn record_search_latency(duration: Duration) {
    histogram!("searchsync_search_seconds").record(duration.as_secs_f64());
}

/// Record an index registration attempt.
pub fn record_registration(status: &str) {
    counter!(
        "searchsync_registrations_total",
        "status" => status.to_string()
    )
    .increment(1);
}
