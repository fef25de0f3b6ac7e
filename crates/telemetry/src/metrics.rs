//! In-process metrics.
//!
//! Counters and histograms are plain atomics; `/metrics` serves a snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A value that moves both ways, such as open readers.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements, saturating at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Latency histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    buckets: [AtomicU64; 12],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    /// Upper bounds; broker fan-outs range from a few ms to the search deadline.
    const BUCKET_BOUNDS: [u64; 12] = [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            count => self.sum() as f64 / count as f64,
        }
    }

    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Metrics collected by the viewer.
#[derive(Debug, Default)]
pub struct Metrics {
    // Message search
    pub searches: Counter,
    pub messages_scanned: Counter,
    pub messages_returned: Counter,
    pub partition_failures: Counter,
    pub searches_truncated: Counter,

    // Consumer groups
    pub group_queries: Counter,
    pub group_failures: Counter,

    // Fan-out
    pub cluster_failures: Counter,
    pub topic_refreshes: Counter,
    pub message_count_refreshes: Counter,

    // Send hook
    pub messages_sent: Counter,
    pub send_errors: Counter,

    // Latency
    pub search_latency_ms: Histogram,
    pub lag_latency_ms: Histogram,
    pub topic_load_latency_ms: Histogram,

    // Gauges
    pub open_readers: Gauge,
    pub cached_topics: Gauge,
    pub cached_groups: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Point-in-time view of [`Metrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub searches: u64,
    pub messages_scanned: u64,
    pub messages_returned: u64,
    pub partition_failures: u64,
    pub searches_truncated: u64,
    pub group_queries: u64,
    pub group_failures: u64,
    pub cluster_failures: u64,
    pub topic_refreshes: u64,
    pub message_count_refreshes: u64,
    pub messages_sent: u64,
    pub send_errors: u64,
    pub search_latency_mean_ms: f64,
    pub lag_latency_mean_ms: f64,
    pub topic_load_latency_mean_ms: f64,
    pub open_readers: u64,
    pub cached_topics: u64,
    pub cached_groups: u64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            searches: self.searches.get(),
            messages_scanned: self.messages_scanned.get(),
            messages_returned: self.messages_returned.get(),
            partition_failures: self.partition_failures.get(),
            searches_truncated: self.searches_truncated.get(),
            group_queries: self.group_queries.get(),
            group_failures: self.group_failures.get(),
            cluster_failures: self.cluster_failures.get(),
            topic_refreshes: self.topic_refreshes.get(),
            message_count_refreshes: self.message_count_refreshes.get(),
            messages_sent: self.messages_sent.get(),
            send_errors: self.send_errors.get(),
            search_latency_mean_ms: self.search_latency_ms.mean(),
            lag_latency_mean_ms: self.lag_latency_ms.mean(),
            topic_load_latency_mean_ms: self.topic_load_latency_ms.mean(),
            open_readers: self.open_readers.get(),
            cached_topics: self.cached_topics.get(),
            cached_groups: self.cached_groups.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
