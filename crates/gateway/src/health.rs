//! Cluster connectivity checks.

use crate::gateway::BrokerGateway;
use tracing::{debug, error};
use viewer_core::Result;

/// Lists topics to verify the cluster answers. Returns the topic count.
pub async fn check_connection(gateway: &dyn BrokerGateway) -> Result<usize> {
    match gateway.list_topics().await {
        Ok(topics) => {
            debug!(
                cluster_id = gateway.cluster_id(),
                topics = topics.len(),
                "Cluster connection healthy"
            );
            Ok(topics.len())
        }
        Err(e) => {
            error!(cluster_id = gateway.cluster_id(), error = %e, "Cluster health check failed");
            Err(e)
        }
    }
}

