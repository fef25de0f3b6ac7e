//! Connection cache: one gateway per registry cluster.

use crate::client::KafkaGateway;
use crate::config::GatewayConfig;
use crate::gateway::{BrokerGateway, GatewayConnector};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use viewer_core::{Cluster, ClusterId, Result};

/// Opens rskafka gateways and keeps them until invalidated.
pub struct KafkaConnector {
    config: GatewayConfig,
    gateways: RwLock<BTreeMap<ClusterId, Arc<dyn BrokerGateway>>>,
}

impl KafkaConnector {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            gateways: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Number of live cluster connections.
    pub async fn connected(&self) -> usize {
        self.gateways.read().await.len()
    }

    async fn open(&self, cluster: &Cluster) -> Result<KafkaGateway> {
        let gateway = KafkaGateway::connect(cluster, self.config.clone()).await?;

        #[cfg(feature = "rdkafka")]
        let gateway = gateway.with_admin(Arc::new(crate::admin::RdkafkaAdmin::new(
            cluster,
            &self.config,
        )?));

        Ok(gateway)
    }
}

#[async_trait]
impl GatewayConnector for KafkaConnector {
    async fn connect(&self, cluster: &Cluster) -> Result<Arc<dyn BrokerGateway>> {
        {
            let gateways = self.gateways.read().await;
            if let Some(gateway) = gateways.get(&cluster.id) {
                return Ok(gateway.clone());
            }
        }

        let gateway: Arc<dyn BrokerGateway> = Arc::new(self.open(cluster).await?);

        // Another task may have connected meanwhile; keep the first one
        let mut gateways = self.gateways.write().await;
        let gateway = gateways.entry(cluster.id).or_insert(gateway).clone();
        debug!(cluster_id = cluster.id, "Cached cluster connection");
        Ok(gateway)
    }

    async fn invalidate(&self, cluster_id: ClusterId) {
        if self.gateways.write().await.remove(&cluster_id).is_some() {
            info!(cluster_id, "Dropped cluster connection");
        }
    }
}
