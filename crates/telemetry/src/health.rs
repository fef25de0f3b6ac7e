//! Per-cluster health, updated on every fan-out.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Last observed state of one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterHealthReport {
    pub cluster_id: u32,
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Aggregated health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub clusters: Vec<ClusterHealthReport>,
}

/// Health of every cluster the viewer has talked to.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    clusters: RwLock<BTreeMap<u32, ClusterHealthReport>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_healthy(&self, cluster_id: u32, name: &str) {
        self.record(cluster_id, name, None);
    }

    pub fn mark_unhealthy(&self, cluster_id: u32, name: &str, msg: impl Into<String>) {
        self.record(cluster_id, name, Some(msg.into()));
    }

    fn record(&self, cluster_id: u32, name: &str, failure: Option<String>) {
        self.clusters.write().insert(
            cluster_id,
            ClusterHealthReport {
                cluster_id,
                name: name.to_string(),
                healthy: failure.is_none(),
                message: failure,
                checked_at: Utc::now(),
            },
        );
    }

    /// Drops a cluster that left the registry.
    pub fn forget(&self, cluster_id: u32) {
        self.clusters.write().remove(&cluster_id);
    }

    pub fn cluster(&self, cluster_id: u32) -> Option<ClusterHealthReport> {
        self.clusters.read().get(&cluster_id).cloned()
    }

    /// Healthy when every observed cluster answered, degraded when some did.
    ///
    /// With no cluster observed yet the viewer reports healthy.
    pub fn report(&self) -> HealthReport {
        let clusters: Vec<ClusterHealthReport> = self.clusters.read().values().cloned().collect();

        let all_healthy = clusters.iter().all(|c| c.healthy);
        let any_healthy = clusters.iter().any(|c| c.healthy);

        let status = if all_healthy {
            HealthStatus::Healthy
        } else if any_healthy {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, clusters }
    }

    /// The viewer can serve as long as one cluster answers.
    pub fn is_ready(&self) -> bool {
        self.report().status.is_serving()
    }

    pub fn is_alive(&self) -> bool {
        true
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
