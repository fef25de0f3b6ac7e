//! Unified error types for the Kafka viewer.
//!
//! Error codes:
//! - CLUSTER_001-003: cluster lookup and connectivity errors
//! - TOPIC_001: topic errors
//! - GROUP_001-002: consumer group errors
//! - PART_001: partition read errors
//! - FILTER_001: invalid caller input

use crate::cluster::ClusterId;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the Kafka viewer.
#[derive(Debug, Error)]
pub enum Error {
    /// No cluster with this id in the registry.
    #[error("[CLUSTER_001] cluster {0} not found")]
    ClusterNotFound(ClusterId),

    /// Cluster exists but does not take part in queries.
    #[error("[CLUSTER_002] cluster {cluster_id} is not active")]
    ClusterInactive { cluster_id: ClusterId },

    /// Network failure or timeout talking to a cluster.
    #[error("[CLUSTER_003] cluster {cluster_id} unreachable: {message}")]
    ClusterUnreachable {
        cluster_id: ClusterId,
        message: String,
    },

    #[error("[TOPIC_001] topic '{topic}' not found on cluster {cluster_id}")]
    TopicNotFound { cluster_id: ClusterId, topic: String },

    #[error("[GROUP_001] consumer group '{group_id}' not found on cluster {cluster_id}")]
    GroupNotFound {
        cluster_id: ClusterId,
        group_id: String,
    },

    #[error("[GROUP_002] failed to describe consumer group '{group_id}': {message}")]
    GroupDescribe { group_id: String, message: String },

    #[error("[PART_001] failed to read {topic}/{partition}: {message}")]
    PartitionRead {
        topic: String,
        partition: i32,
        message: String,
    },

    /// Caller input rejected before any network call.
    #[error("[FILTER_001] {0}")]
    InvalidFilter(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn unreachable(cluster_id: ClusterId, msg: impl Into<String>) -> Self {
        Self::ClusterUnreachable {
            cluster_id,
            message: msg.into(),
        }
    }

    pub fn topic_not_found(cluster_id: ClusterId, topic: impl Into<String>) -> Self {
        Self::TopicNotFound {
            cluster_id,
            topic: topic.into(),
        }
    }

    pub fn partition_read(topic: impl Into<String>, partition: i32, msg: impl Into<String>) -> Self {
        Self::PartitionRead {
            topic: topic.into(),
            partition,
            message: msg.into(),
        }
    }

    pub fn group_describe(group_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::GroupDescribe {
            group_id: group_id.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure says something about the cluster as a whole,
    /// rather than about a single topic, partition or group on it.
    pub fn is_cluster_level(&self) -> bool {
        matches!(
            self,
            Self::ClusterUnreachable { .. } | Self::Timeout(_) | Self::Unsupported(_)
        )
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ClusterNotFound(_) => 404,
            Self::ClusterInactive { .. } => 409,
            Self::ClusterUnreachable { .. } => 502,
            Self::TopicNotFound { .. } => 404,
            Self::GroupNotFound { .. } => 404,
            Self::GroupDescribe { .. } => 502,
            Self::PartitionRead { .. } => 502,
            Self::InvalidFilter(_) => 400,
            Self::Timeout(_) => 504,
            Self::Unsupported(_) => 501,
            Self::Serialization(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Get the stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClusterNotFound(_) => "CLUSTER_001",
            Self::ClusterInactive { .. } => "CLUSTER_002",
            Self::ClusterUnreachable { .. } => "CLUSTER_003",
            Self::TopicNotFound { .. } => "TOPIC_001",
            Self::GroupNotFound { .. } => "GROUP_001",
            Self::GroupDescribe { .. } => "GROUP_002",
            Self::PartitionRead { .. } => "PART_001",
            Self::InvalidFilter(_) => "FILTER_001",
            Self::Timeout(_) => "TIMEOUT",
            Self::Unsupported(_) => "UNSUPPORTED",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidFilter(errors.to_string())
    }
}
