//! Common test setup functions.

use aggregator::{BrokerRegistry, Inspector, LagConfig, SearchConfig};
use api::{router, state::AppState};
use axum::Router;
use std::sync::Arc;
use telemetry::init_test_tracing;
use viewer_core::{Cluster, ClusterId};

use crate::mocks::{MockConnector, MockGateway};

/// Test context with in-memory clusters.
///
/// Runs the production code paths end to end:
/// - the real `Inspector` with its caches and engines
/// - the real Axum router
/// - `MockGateway` clusters behind the same `BrokerGateway` trait
pub struct TestContext {
    pub connector: Arc<MockConnector>,
    pub inspector: Arc<Inspector>,
    pub router: Router,
}

impl TestContext {
    /// Context over `clusters`, each backed by an empty mock gateway.
    pub fn new(clusters: Vec<Cluster>) -> Self {
        Self::with_config(clusters, SearchConfig::default())
    }

    pub fn with_config(clusters: Vec<Cluster>, search: SearchConfig) -> Self {
        init_test_tracing();

        let connector = Arc::new(MockConnector::new());
        for cluster in &clusters {
            connector.register(Arc::new(MockGateway::new(cluster.id)));
        }

        let registry = Arc::new(
            BrokerRegistry::with_clusters(clusters).expect("fixture clusters are valid"),
        );
        let inspector = Arc::new(Inspector::new(
            registry,
            connector.clone(),
            search,
            LagConfig::default(),
        ));
        let router = router(AppState::new(inspector.clone()));

        Self {
            connector,
            inspector,
            router,
        }
    }

    /// The mock gateway of a cluster.
    pub fn gateway(&self, cluster_id: ClusterId) -> Arc<MockGateway> {
        self.connector
            .gateway(cluster_id)
            .expect("cluster has a mock gateway")
    }

    /// Readers the search engine still holds.
    pub fn live_readers(&self) -> usize {
        self.inspector.search_engine().arena().live()
    }
}
