//! Default bounds for searches, lag queries and broker calls.
//!
//! These are the fallbacks used when configuration leaves a value unset.
//! Config structs in the aggregator and gateway crates default to them.

// === Search Limits ===

/// Messages returned by a search when the caller gives no limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 1000;

/// Upper bound on the caller-supplied search limit.
pub const MAX_SEARCH_LIMIT: usize = 10_000;

/// Trailing window for `onlyNew` searches (5 minutes).
pub const DEFAULT_ONLY_NEW_WINDOW_SECS: u64 = 300;

/// Read-ahead per partition as a multiple of the limit.
pub const DEFAULT_READ_AHEAD_FACTOR: usize = 2;

/// Read-ahead multiple when a text filter is present.
///
/// Most scanned records will not match, so the scan reaches further back.
pub const DEFAULT_TEXT_READ_AHEAD_FACTOR: usize = 20;

/// Records scanned from one partition before it stops.
pub const DEFAULT_MAX_SCAN_PER_PARTITION: usize = 50_000;

/// Records scanned across all partitions of one search.
pub const DEFAULT_MAX_SCAN_TOTAL: usize = 500_000;

/// Partitions read in parallel within one search.
pub const DEFAULT_PARTITION_CONCURRENCY: usize = 16;

/// Caller-level deadline for a whole search (seconds).
pub const DEFAULT_SEARCH_DEADLINE_SECS: u64 = 30;

// === Broker Call Limits ===

/// Timeout on a single metadata or offset call (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// A partition read that waits this long with no data ends (seconds).
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;

/// Maximum bytes per fetch request (1MB).
pub const DEFAULT_FETCH_MAX_BYTES: i32 = 1024 * 1024;

/// Broker-side wait for a fetch (milliseconds).
pub const DEFAULT_FETCH_MAX_WAIT_MS: i32 = 500;

// === Topics ===

/// Retention reported when `retention.ms` cannot be read.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Topics with this prefix are broker-internal and never listed.
pub const INTERNAL_TOPIC_PREFIX: &str = "__";

/// Whether a topic name is broker-internal.
pub fn is_internal_topic(name: &str) -> bool {
    name.starts_with(INTERNAL_TOPIC_PREFIX)
}

// === Consumer Groups ===

/// Groups queried in parallel on one cluster.
pub const DEFAULT_GROUP_CONCURRENCY: usize = 8;
