//! Messages read from topics and the search query that selects them.

use crate::cluster::ClusterId;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use validator::Validate;

/// Rendered in place of a record key that is absent.
pub const NULL_KEY: &str = "{Null}";

/// Rendered in place of a record key that is present but empty.
pub const EMPTY_KEY: &str = "{Empty}";

/// Renders a raw record key for display.
pub fn render_key(key: Option<&[u8]>) -> String {
    match key {
        None => NULL_KEY.to_string(),
        Some([]) => EMPTY_KEY.to_string(),
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Renders a raw record value for display. Missing values render empty.
pub fn render_value(value: Option<&[u8]>) -> String {
    value
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

/// A message read from a partition. Offset orders messages within a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: String,
    pub value: String,
    #[serde(rename = "timestampUtc")]
    pub timestamp: DateTime<Utc>,
}

/// Which end of the topic a search reads from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMode {
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "oldest")]
    Oldest,
    /// Newest messages inside a short trailing time window
    #[serde(rename = "onlyNew")]
    OnlyNew,
}

impl SearchMode {
    /// Whether results are ordered oldest first.
    pub fn ascending(&self) -> bool {
        matches!(self, Self::Oldest)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::OnlyNew => "onlyNew",
        }
    }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "onlyNew" => Ok(Self::OnlyNew),
            other => Err(Error::invalid_filter(format!(
                "unknown search type '{}', expected newest, oldest or onlyNew",
                other
            ))),
        }
    }
}

/// Parameters of a message search against one topic on one cluster.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    pub cluster_id: ClusterId,
    #[validate(length(min = 1, max = 249))]
    pub topic: String,
    #[serde(default)]
    pub mode: SearchMode,
    /// Maximum number of messages returned
    pub limit: Option<usize>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring matched against message values
    pub query: Option<String>,
}

impl MessageQuery {
    pub fn new(cluster_id: ClusterId, topic: impl Into<String>) -> Self {
        Self {
            cluster_id,
            topic: topic.into(),
            mode: SearchMode::Newest,
            limit: None,
            from: None,
            to: None,
            query: None,
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_window(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Validates caller input. Runs before any network call.
    pub fn check(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::invalid_filter("topic is required"));
        }
        self.validate()?;
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(Error::invalid_filter(format!(
                    "'from' ({}) is after 'to' ({})",
                    from, to
                )));
            }
        }
        Ok(())
    }

    /// Lowercased text term, if a non-blank query was given.
    pub fn text_term(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    pub fn has_window(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }
}

/// Orders two messages for a search mode.
///
/// Timestamp ascending for `oldest`, descending otherwise; ties broken by
/// partition then offset, both ascending.
pub fn compare_messages(mode: SearchMode, a: &TopicMessage, b: &TopicMessage) -> Ordering {
    let by_time = if mode.ascending() {
        a.timestamp.cmp(&b.timestamp)
    } else {
        b.timestamp.cmp(&a.timestamp)
    };
    by_time
        .then(a.partition.cmp(&b.partition))
        .then(a.offset.cmp(&b.offset))
}

/// A message handed to the send hook.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    #[validate(length(min = 1, max = 249))]
    pub topic: String,
    pub key: Option<String>,
    #[serde(default = "default_value")]
    pub value: String,
}

fn default_value() -> String {
    "{}".to_string()
}

/// Where the send hook placed a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}
