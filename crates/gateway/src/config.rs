//! Gateway configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use viewer_core::limits;

/// Broker call configuration shared by every cluster connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Timeout on a metadata, offset or admin call in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum bytes per fetch request
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: i32,
    /// Broker-side wait for a fetch in milliseconds
    #[serde(default = "default_fetch_max_wait_ms")]
    pub fetch_max_wait_ms: i32,
    /// Compression for sent messages (none, gzip, snappy, lz4, zstd)
    #[serde(default = "default_compression")]
    pub compression: String,
}

fn default_request_timeout_ms() -> u64 {
    limits::DEFAULT_REQUEST_TIMEOUT_SECS * 1000
}

fn default_fetch_max_bytes() -> i32 {
    limits::DEFAULT_FETCH_MAX_BYTES
}

fn default_fetch_max_wait_ms() -> i32 {
    limits::DEFAULT_FETCH_MAX_WAIT_MS
}

fn default_compression() -> String {
    "none".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            fetch_max_bytes: default_fetch_max_bytes(),
            fetch_max_wait_ms: default_fetch_max_wait_ms(),
            compression: default_compression(),
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
