//! Broker registry: the known clusters and their endpoints.
//!
//! Pure state. Callers that hold connections or cached entities react to
//! updates and removals themselves.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;
use validator::Validate;
use viewer_core::{Cluster, ClusterId, Error, Result};

#[derive(Debug, Default)]
pub struct BrokerRegistry {
    clusters: RwLock<BTreeMap<ClusterId, Cluster>>,
    next_id: AtomicU32,
}

impl BrokerRegistry {
    pub fn new() -> Self {
        Self {
            clusters: RwLock::new(BTreeMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Builds a registry seeded with configured clusters.
    pub fn with_clusters(clusters: impl IntoIterator<Item = Cluster>) -> Result<Self> {
        let registry = Self::new();
        for cluster in clusters {
            registry.add(cluster)?;
        }
        Ok(registry)
    }

    /// All clusters ordered by id.
    pub fn list(&self) -> Vec<Cluster> {
        self.clusters.read().values().cloned().collect()
    }

    /// Clusters that take part in fan-out.
    pub fn active(&self) -> Vec<Cluster> {
        self.clusters
            .read()
            .values()
            .filter(|c| c.is_active())
            .cloned()
            .collect()
    }

    pub fn get(&self, id: ClusterId) -> Result<Cluster> {
        self.clusters
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::ClusterNotFound(id))
    }

    /// Looks up a cluster that must be active.
    pub fn get_active(&self, id: ClusterId) -> Result<Cluster> {
        let cluster = self.get(id)?;
        if !cluster.is_active() {
            return Err(Error::ClusterInactive { cluster_id: id });
        }
        Ok(cluster)
    }

    /// Adds a cluster. An id of 0 asks the registry to assign one.
    pub fn add(&self, mut cluster: Cluster) -> Result<Cluster> {
        cluster.validate()?;

        let mut clusters = self.clusters.write();
        if cluster.id == 0 {
            cluster.id = self.allocate_id(&clusters);
        } else if clusters.contains_key(&cluster.id) {
            return Err(Error::invalid_filter(format!(
                "cluster {} already exists",
                cluster.id
            )));
        }
        self.next_id.fetch_max(cluster.id.saturating_add(1), Ordering::Relaxed);

        info!(cluster_id = cluster.id, name = %cluster.name, "Registered cluster");
        clusters.insert(cluster.id, cluster.clone());
        Ok(cluster)
    }

    fn allocate_id(&self, clusters: &BTreeMap<ClusterId, Cluster>) -> ClusterId {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 && !clusters.contains_key(&id) {
                return id;
            }
        }
    }

    /// Replaces a cluster's settings. Returns the previous version.
    /// Replaces a cluster's settings. Secrets left empty keep their stored value.
    pub fn update(&self, mut cluster: Cluster) -> Result<Cluster> {
        cluster.validate()?;

        let mut clusters = self.clusters.write();
        let slot = clusters
            .get_mut(&cluster.id)
            .ok_or(Error::ClusterNotFound(cluster.id))?;
        cluster.credentials.inherit_secret(&slot.credentials);
        info!(cluster_id = cluster.id, name = %cluster.name, "Updated cluster");
        Ok(std::mem::replace(slot, cluster))
    }

    pub fn remove(&self, id: ClusterId) -> Result<Cluster> {
        let removed = self
            .clusters
            .write()
            .remove(&id)
            .ok_or(Error::ClusterNotFound(id))?;
        info!(cluster_id = id, name = %removed.name, "Removed cluster");
        Ok(removed)
    }
}
