//! Search and lag engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use viewer_core::limits;

/// Message search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Limit applied when the caller gives none
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Largest limit a caller may ask for
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Trailing window of `onlyNew` searches in seconds
    #[serde(default = "default_only_new_window_secs")]
    pub only_new_window_secs: u64,
    /// Per-partition read-ahead as a multiple of the limit
    #[serde(default = "default_read_ahead_factor")]
    pub read_ahead_factor: usize,
    /// Read-ahead multiple when a text filter is present
    #[serde(default = "default_text_read_ahead_factor")]
    pub text_read_ahead_factor: usize,
    /// Records scanned from one partition at most
    #[serde(default = "default_max_scan_per_partition")]
    pub max_scan_per_partition: usize,
    /// Records scanned across one search at most
    #[serde(default = "default_max_scan_total")]
    pub max_scan_total: usize,
    /// Partitions read in parallel
    #[serde(default = "default_partition_concurrency")]
    pub partition_concurrency: usize,
    /// Deadline for a whole search in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// A read with no data for this long ends the partition, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_limit() -> usize {
    limits::DEFAULT_SEARCH_LIMIT
}

fn default_max_limit() -> usize {
    limits::MAX_SEARCH_LIMIT
}

fn default_only_new_window_secs() -> u64 {
    limits::DEFAULT_ONLY_NEW_WINDOW_SECS
}

fn default_read_ahead_factor() -> usize {
    limits::DEFAULT_READ_AHEAD_FACTOR
}

fn default_text_read_ahead_factor() -> usize {
    limits::DEFAULT_TEXT_READ_AHEAD_FACTOR
}

fn default_max_scan_per_partition() -> usize {
    limits::DEFAULT_MAX_SCAN_PER_PARTITION
}

fn default_max_scan_total() -> usize {
    limits::DEFAULT_MAX_SCAN_TOTAL
}

fn default_partition_concurrency() -> usize {
    limits::DEFAULT_PARTITION_CONCURRENCY
}

fn default_deadline_ms() -> u64 {
    limits::DEFAULT_SEARCH_DEADLINE_SECS * 1000
}

fn default_read_timeout_ms() -> u64 {
    limits::DEFAULT_READ_TIMEOUT_SECS * 1000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            only_new_window_secs: default_only_new_window_secs(),
            read_ahead_factor: default_read_ahead_factor(),
            text_read_ahead_factor: default_text_read_ahead_factor(),
            max_scan_per_partition: default_max_scan_per_partition(),
            max_scan_total: default_max_scan_total(),
            partition_concurrency: default_partition_concurrency(),
            deadline_ms: default_deadline_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl SearchConfig {
    /// Effective limit for a caller-supplied one.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|l| *l > 0)
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }

    /// Records read back from the end of each partition.
    pub fn read_budget(&self, limit: usize, has_text: bool) -> usize {
        let factor = if has_text {
            self.text_read_ahead_factor
        } else {
            self.read_ahead_factor
        };
        limit
            .saturating_mul(factor.max(1))
            .min(self.max_scan_per_partition)
    }

    pub fn only_new_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.only_new_window_secs as i64)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Consumer lag configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LagConfig {
    /// Groups resolved in parallel per cluster
    #[serde(default = "default_group_concurrency")]
    pub group_concurrency: usize,
}

fn default_group_concurrency() -> usize {
    limits::DEFAULT_GROUP_CONCURRENCY
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            group_concurrency: default_group_concurrency(),
        }
    }
}
