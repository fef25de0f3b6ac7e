//! Gateway traits and the raw broker types they exchange.
//!
//! Every call is bounded by a timeout and may fail independently; callers
//! decide whether a failure is absorbed or propagated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use viewer_core::{Cluster, ClusterId, GroupState, Result, Watermarks};

/// Topic metadata as listed by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    pub name: String,
    pub partitions: Vec<i32>,
}

impl TopicMetadata {
    pub fn new(name: impl Into<String>, partitions: Vec<i32>) -> Self {
        Self {
            name: name.into(),
            partitions,
        }
    }

    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }
}

/// The topic settings the viewer reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicConfig {
    /// `retention.ms`, negative for unlimited
    pub retention_ms: Option<i64>,
}

/// A record pulled from a partition, undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub timestamp: DateTime<Utc>,
}

/// Result of one pull from a [`PartitionReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Record(RawRecord),
    /// The reader caught up with the high watermark
    EndOfPartition,
    /// No data arrived within the read timeout
    TimedOut,
}

/// A (topic, partition) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

/// A member as reported by a group describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescription {
    pub member_id: String,
    pub client_id: String,
    pub host: String,
    pub assignment: Vec<TopicPartition>,
}

/// Result of describing one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
    pub group_id: String,
    pub state: GroupState,
    pub members: Vec<MemberDescription>,
    /// Per-group error reported inside an otherwise successful describe
    pub error: Option<String>,
}

/// A committed group offset. Negative offsets mean nothing was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// An open read session on one partition.
///
/// Readers hold broker resources; callers must `close` them on every path.
#[async_trait]
pub trait PartitionReader: Send {
    fn topic(&self) -> &str;

    fn partition(&self) -> i32;

    /// Moves the read position; the next record returned has offset >= `offset`.
    async fn seek(&mut self, offset: i64) -> Result<()>;

    /// Pulls the next record, waiting at most `timeout` for data.
    async fn next(&mut self, timeout: Duration) -> Result<ReadOutcome>;

    async fn close(&mut self);
}

/// Read-only capability set of one cluster, plus the send hook.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    fn cluster_id(&self) -> ClusterId;

    /// User topics with their partition ids; broker-internal topics excluded.
    async fn list_topics(&self) -> Result<Vec<TopicMetadata>>;

    async fn topic_config(&self, topic: &str) -> Result<TopicConfig>;

    async fn watermarks(&self, topic: &str, partition: i32) -> Result<Watermarks>;

    /// Earliest offset whose timestamp is at or after `timestamp`, if any.
    async fn offset_for_timestamp(
        &self,
        topic: &str,
        partition: i32,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<i64>>;

    async fn open_reader(&self, topic: &str, partition: i32) -> Result<Box<dyn PartitionReader>>;

    async fn list_groups(&self) -> Result<Vec<String>>;

    /// Describes a batch of groups in one call.
    async fn describe_groups(&self, group_ids: &[String]) -> Result<Vec<GroupDescription>>;

    async fn committed_offsets(&self, group_id: &str) -> Result<Vec<CommittedOffset>>;

    /// Produces one record and returns its offset.
    async fn send(
        &self,
        topic: &str,
        partition: i32,
        key: Option<&str>,
        value: &str,
    ) -> Result<i64>;
}

/// Group and config admin, split out because the data-plane client lacks it.
#[async_trait]
pub trait GroupAdmin: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<String>>;

    async fn describe_groups(&self, group_ids: &[String]) -> Result<Vec<GroupDescription>>;

    async fn committed_offsets(&self, group_id: &str) -> Result<Vec<CommittedOffset>>;

    async fn topic_config(&self, topic: &str) -> Result<TopicConfig>;
}

/// Opens gateways for registry clusters.
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    async fn connect(&self, cluster: &Cluster) -> Result<Arc<dyn BrokerGateway>>;

    /// Drops any cached connection to the cluster.
    async fn invalidate(&self, cluster_id: ClusterId);
}
