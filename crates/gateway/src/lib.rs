//! Broker gateway: the per-cluster capability set the viewer queries.
//!
//! The data plane (metadata, watermarks, reads, produce) runs on rskafka.
//! Consumer-group and topic-config admin is delegated to a [`GroupAdmin`],
//! backed by librdkafka when the `rdkafka` feature is enabled.

pub mod assignment;
pub mod client;
pub mod config;
pub mod connector;
pub mod gateway;
pub mod health;
pub mod partitioner;
pub mod reader;
pub mod topics;

#[cfg(feature = "rdkafka")]
pub mod admin;

pub use client::KafkaGateway;
pub use config::*;
pub use connector::KafkaConnector;
pub use gateway::*;
