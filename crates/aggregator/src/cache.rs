//! Metadata cache: last-known-good topics and consumer groups.
//!
//! Entries are keyed by (cluster id, name). Writes are keyed upserts, so a
//! refresh only touches the entries it produced. Reads never hit the network.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use viewer_core::{ClusterId, ConsumerGroup, EntityKey, TopicInfo};

/// An entity cached under its (cluster, name) key.
pub trait Keyed: Clone {
    fn cache_key(&self) -> EntityKey;
}

impl Keyed for TopicInfo {
    fn cache_key(&self) -> EntityKey {
        self.key()
    }
}

impl Keyed for ConsumerGroup {
    fn cache_key(&self) -> EntityKey {
        self.key()
    }
}

/// Keyed snapshot store.
#[derive(Debug)]
pub struct MetadataCache<T> {
    entries: RwLock<HashMap<EntityKey, T>>,
    /// Whether a full load has completed at least once
    loaded: AtomicBool,
}

impl<T> Default for MetadataCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            loaded: AtomicBool::new(false),
        }
    }
}

impl<T: Keyed> MetadataCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first full load completes.
    pub fn is_cold(&self) -> bool {
        !self.loaded.load(Ordering::Acquire)
    }

    pub fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Release);
    }

    pub fn get(&self, key: &EntityKey) -> Option<T> {
        self.entries.read().get(key).cloned()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.entries.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn upsert(&self, item: T) {
        self.entries.write().insert(item.cache_key(), item);
    }

    pub fn upsert_all(&self, items: impl IntoIterator<Item = T>) {
        let mut entries = self.entries.write();
        for item in items {
            entries.insert(item.cache_key(), item);
        }
    }

    /// Applies `f` to one entry in place. Returns false if it is absent.
    pub fn update(&self, key: &EntityKey, f: impl FnOnce(&mut T)) -> bool {
        match self.entries.write().get_mut(key) {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }

    /// Drops entries of `cluster_id` whose name is not in `keep`.
    ///
    /// Called after a successful full listing of that cluster.
    pub fn retain_cluster(&self, cluster_id: ClusterId, keep: &[String]) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.cluster_id != cluster_id || keep.contains(&key.name));
        before - entries.len()
    }

    /// Drops every entry of a cluster.
    pub fn remove_cluster(&self, cluster_id: ClusterId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.cluster_id != cluster_id);
        before - entries.len()
    }
}

pub type TopicCache = MetadataCache<TopicInfo>;
pub type ConsumerCache = MetadataCache<ConsumerGroup>;
