//! Telemetry for the Kafka viewer.
//!
//! Structured logging through `tracing`, in-process metrics and a
//! per-cluster health registry fed by the fan-out paths.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
