//! Background workers for the Kafka viewer.
//!
//! Keeps the metadata caches warm:
//! - Topics (listing and retention, every active cluster)
//! - Message counts (watermark sums of cached topics)
//! - Consumer groups (lag of every group)
//! - Cluster probes (health registry)

pub mod refresh;
pub mod scheduler;

pub use refresh::RefreshWorker;
pub use scheduler::*;
