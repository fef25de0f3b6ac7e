//! Topic and partition metadata.

use crate::cluster::ClusterId;
use serde::{Deserialize, Serialize};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Composite identity of a per-cluster entity (topic or consumer group).
///
/// The same name may exist independently on several clusters, so every cache
/// and every de-duplication step keys on the pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub cluster_id: ClusterId,
    pub name: String,
}

impl EntityKey {
    pub fn new(cluster_id: ClusterId, name: impl Into<String>) -> Self {
        Self {
            cluster_id,
            name: name.into(),
        }
    }
}

/// Topic summary as shown in the topic list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInfo {
    pub name: String,
    pub partitions: u32,
    /// Approximate message count; `None` until computed
    pub messages: Option<i64>,
    /// Retention in days, `-1` for unlimited
    pub retention_days: i64,
    pub cluster_id: ClusterId,
    pub cluster_name: String,
}

impl TopicInfo {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.cluster_id, self.name.clone())
    }
}

/// Converts a `retention.ms` value into whole days.
pub fn retention_days_from_ms(retention_ms: i64) -> i64 {
    if retention_ms < 0 {
        -1
    } else {
        retention_ms / MS_PER_DAY
    }
}

/// Topic list filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicFilter {
    /// Case-insensitive substring of the topic name
    pub name: Option<String>,
}

impl TopicFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, topic: &TopicInfo) -> bool {
        match self.name.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => topic.name.to_lowercase().contains(&term.to_lowercase()),
        }
    }
}

/// Low and high watermark of a partition.
///
/// `low` is the oldest retained offset, `high` the next offset to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermarks {
    pub low: i64,
    pub high: i64,
}

impl Watermarks {
    pub fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }

    pub fn message_count(&self) -> i64 {
        (self.high - self.low).max(0)
    }

    pub fn clamp(&self, offset: i64) -> i64 {
        offset.clamp(self.low, self.high.max(self.low))
    }
}

/// Partition descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub partition: i32,
    pub low: i64,
    pub high: i64,
}

/// All partitions of one topic on one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPartitions {
    pub topic: String,
    pub cluster_id: ClusterId,
    pub total_messages: i64,
    pub partitions: Vec<PartitionInfo>,
}
