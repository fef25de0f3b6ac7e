//! Topic metadata helpers.

use crate::gateway::{TopicConfig, TopicMetadata};
use viewer_core::limits::is_internal_topic;

/// Topic config key holding the retention period.
pub const RETENTION_MS: &str = "retention.ms";

/// Drops broker-internal topics and sorts by name.
pub fn user_topics(topics: impl IntoIterator<Item = TopicMetadata>) -> Vec<TopicMetadata> {
    let mut topics: Vec<TopicMetadata> = topics
        .into_iter()
        .filter(|t| !is_internal_topic(&t.name))
        .map(|mut t| {
            t.partitions.sort_unstable();
            t
        })
        .collect();
    topics.sort_by(|a, b| a.name.cmp(&b.name));
    topics
}

/// Builds a [`TopicConfig`] from raw `(name, value)` config entries.
pub fn topic_config_from_entries<'a>(
    entries: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
) -> TopicConfig {
    let retention_ms = entries
        .into_iter()
        .find(|(name, _)| *name == RETENTION_MS)
        .and_then(|(_, value)| value)
        .and_then(|v| v.trim().parse::<i64>().ok());
    TopicConfig { retention_ms }
}
