//! Configuration for the sync engine.
//!
//! # Example
//!
//! ```
//! use searchsync::SearchSyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SearchSyncConfig::default();
//! assert_eq!(config.default_batch_size, 100_000);
//!
//! // Full config
//! let config = SearchSyncConfig {
//!     default_batch_size: 1_000,
//!     poll_initial_interval_ms: 25,
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::remote::PollConfig;

/// Configuration for the sync engine.
///
/// All fields have sensible defaults; per-index declarations can override
/// the batch size.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSyncConfig {
    /// Batch size for index population when a declaration does not set one
    /// (default: 100,000)
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,

    /// Initial interval between task-completion polls (default: 50 ms)
    #[serde(default = "default_poll_initial_interval_ms")]
    pub poll_initial_interval_ms: u64,

    /// Cap on the poll interval as backoff grows (default: 1000 ms)
    #[serde(default = "default_poll_max_interval_ms")]
    pub poll_max_interval_ms: u64,

    /// Backoff multiplier between polls (default: 2.0)
    #[serde(default = "default_poll_factor")]
    pub poll_factor: f64,
}

fn default_batch_size() -> usize { 100_000 }
fn default_poll_initial_interval_ms() -> u64 { 50 }
fn default_poll_max_interval_ms() -> u64 { 1_000 }
fn default_poll_factor() -> f64 { 2.0 }

impl Default for SearchSyncConfig {
    fn default() -> Self {
        Self {
            default_batch_size: default_batch_size(),
            poll_initial_interval_ms: default_poll_initial_interval_ms(),
            poll_max_interval_ms: default_poll_max_interval_ms(),
            poll_factor: default_poll_factor(),
        }
    }
}

impl SearchSyncConfig {
    /// Poll configuration derived from the interval settings.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            initial_interval: Duration::from_millis(self.poll_initial_interval_ms),
            max_interval: Duration::from_millis(self.poll_max_interval_ms),
            factor: self.poll_factor,
        }
    }
}
