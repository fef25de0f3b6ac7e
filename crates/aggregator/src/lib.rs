//! Cross-cluster aggregation for the Kafka viewer.
//!
//! The [`Inspector`] is the entry point: it owns the broker registry, the
//! metadata caches and the search and lag engines, and fans requests out
//! over the active clusters.

pub mod cache;
pub mod config;
pub mod inspector;
pub mod lag;
pub mod reader;
pub mod registry;
pub mod search;

pub use cache::{ConsumerCache, MetadataCache, TopicCache};
pub use config::{LagConfig, SearchConfig};
pub use inspector::Inspector;
pub use lag::LagEngine;
pub use reader::{ReaderArena, ReaderLease};
pub use registry::BrokerRegistry;
pub use search::{SearchEngine, SearchOutcome};
