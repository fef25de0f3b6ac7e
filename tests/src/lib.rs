//! Shared support for the Kafka viewer integration tests.
//!
//! Clusters are simulated in memory by [`mocks::MockGateway`], so every
//! suite runs without a broker.

pub mod fixtures;
pub mod mocks;
pub mod setup;
