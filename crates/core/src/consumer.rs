//! Consumer groups, partition lag and member attribution.

use crate::cluster::ClusterId;
use crate::topic::EntityKey;
use serde::{Deserialize, Serialize};

/// Raw lifecycle state reported by the group coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupState {
    Stable,
    PreparingRebalance,
    CompletingRebalance,
    Empty,
    Dead,
    /// A state string this viewer does not recognise
    Other(String),
}

impl GroupState {
    /// Parses the coordinator's state string.
    ///
    /// Older brokers report `AwaitingSync` for what newer ones call
    /// `CompletingRebalance`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Stable" => Self::Stable,
            "PreparingRebalance" => Self::PreparingRebalance,
            "CompletingRebalance" | "AwaitingSync" => Self::CompletingRebalance,
            "Empty" => Self::Empty,
            "Dead" => Self::Dead,
            other => Self::Other(other.to_string()),
        }
    }

    /// Normalized status shown to users.
    pub fn status(&self) -> GroupStatus {
        match self {
            Self::Stable => GroupStatus::Active,
            Self::Dead => GroupStatus::Dead,
            Self::Empty => GroupStatus::Empty,
            Self::PreparingRebalance | Self::CompletingRebalance => GroupStatus::Rebalancing,
            Self::Other(_) => GroupStatus::Unknown,
        }
    }
}

/// Coarse consumer group status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupStatus {
    Active,
    Dead,
    Empty,
    Rebalancing,
    Unknown,
    /// The group was described but a later step failed
    Error,
}

/// Lag of one group on one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionLag {
    pub topic: String,
    pub partition: i32,
    pub committed_offset: i64,
    pub high_watermark: i64,
    pub lag: i64,
}

impl PartitionLag {
    /// Builds a lag record, flooring lag at zero.
    ///
    /// A committed offset past the watermark (stale metadata) reports zero lag.
    pub fn new(topic: impl Into<String>, partition: i32, committed_offset: i64, high_watermark: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            committed_offset,
            high_watermark,
            lag: (high_watermark - committed_offset).max(0),
        }
    }

    pub fn is_for(&self, topic: &str, partition: i32) -> bool {
        self.topic == topic && self.partition == partition
    }
}

/// A group member with the partitions assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub member_id: String,
    pub client_id: String,
    pub host: String,
    pub partitions: Vec<PartitionLag>,
}

/// Consumer group as shown in the consumer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerGroup {
    #[serde(rename = "group")]
    pub group_id: String,
    /// Member summary, e.g. `2 member(s)` or `no-member`
    #[serde(rename = "member")]
    pub member_summary: String,
    pub lag: i64,
    pub status: GroupStatus,
    pub cluster_id: ClusterId,
    pub cluster_name: String,
    pub members: Option<Vec<GroupMember>>,
    pub partitions: Option<Vec<PartitionLag>>,
}

impl ConsumerGroup {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.cluster_id, self.group_id.clone())
    }

    pub fn partition_lags(&self) -> &[PartitionLag] {
        self.partitions.as_deref().unwrap_or(&[])
    }

    pub fn members(&self) -> &[GroupMember] {
        self.members.as_deref().unwrap_or(&[])
    }

    /// Whether any committed partition belongs to `topic`.
    pub fn references_topic(&self, topic: &str) -> bool {
        self.partition_lags().iter().any(|p| p.topic == topic)
    }

    /// The group restricted to one topic, or `None` when it has no partitions there.
    ///
    /// Aggregate lag is recomputed from the retained partitions.
    pub fn restricted_to_topic(&self, topic: &str) -> Option<Self> {
        let partitions: Vec<PartitionLag> = self
            .partition_lags()
            .iter()
            .filter(|p| p.topic == topic)
            .cloned()
            .collect();
        if partitions.is_empty() {
            return None;
        }

        let members: Vec<GroupMember> = self
            .members()
            .iter()
            .filter_map(|m| {
                let assigned: Vec<PartitionLag> = m
                    .partitions
                    .iter()
                    .filter(|p| p.topic == topic)
                    .cloned()
                    .collect();
                (!assigned.is_empty()).then(|| GroupMember {
                    partitions: assigned,
                    ..m.clone()
                })
            })
            .collect();

        Some(Self {
            lag: total_lag(&partitions),
            members: (!members.is_empty()).then_some(members),
            partitions: Some(partitions),
            ..self.clone()
        })
    }
}

/// Sum of partition lags.
pub fn total_lag(partitions: &[PartitionLag]) -> i64 {
    partitions.iter().map(|p| p.lag).sum()
}

/// Member summary label for a group with `count` members.
pub fn member_summary(count: usize) -> String {
    if count > 0 {
        format!("{} member(s)", count)
    } else {
        "no-member".to_string()
    }
}

/// Consumer list filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumerFilter {
    /// Only groups with committed offsets on this topic
    pub topic: Option<String>,
}

impl ConsumerFilter {
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
        }
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}
