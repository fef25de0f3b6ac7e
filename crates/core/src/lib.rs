//! Core types, error taxonomy and defaults for the multi-cluster Kafka viewer.

pub mod cluster;
pub mod consumer;
pub mod error;
pub mod limits;
pub mod message;
pub mod topic;

pub use cluster::*;
pub use consumer::*;
pub use error::{Error, Result};
pub use message::*;
pub use topic::*;
