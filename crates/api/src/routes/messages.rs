//! Message search and the send hook.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;
use viewer_core::{ClusterId, Error, MessageQuery, OutgoingMessage, SearchMode, SentMessage};

use crate::extractors::{ApiJson, ApiQuery};
use crate::response::{ApiError, MessagesResponse};
use crate::state::AppState;

/// Query string of a message search. Everything arrives as text so that
/// missing and malformed values map onto one error code.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub topic: Option<String>,
    pub broker_id: Option<String>,
    pub search_type: Option<String>,
    pub limit: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub query: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_time(name: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, Error> {
    non_blank(value)
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| Error::invalid_filter(format!("invalid '{}' timestamp '{}': {}", name, raw, e)))
        })
        .transpose()
}

impl SearchParams {
    /// Builds a validated query. Fails before any broker is contacted.
    pub fn into_query(self) -> Result<MessageQuery, Error> {
        let topic = non_blank(self.topic).ok_or_else(|| Error::invalid_filter("topic is required"))?;
        let broker_id: ClusterId = non_blank(self.broker_id)
            .ok_or_else(|| Error::invalid_filter("brokerId is required"))?
            .trim()
            .parse()
            .map_err(|_| Error::invalid_filter("brokerId must be a cluster id"))?;

        let mode: SearchMode = self.search_type.as_deref().unwrap_or_default().parse()?;
        let limit = non_blank(self.limit)
            .map(|l| {
                l.trim()
                    .parse::<usize>()
                    .map_err(|_| Error::invalid_filter(format!("invalid limit '{}'", l)))
            })
            .transpose()?;

        let mut query = MessageQuery::new(broker_id, topic.trim())
            .with_mode(mode)
            .with_window(parse_time("from", self.from)?, parse_time("to", self.to)?);
        query.limit = limit;
        query.query = non_blank(self.query);

        query.check()?;
        Ok(query)
    }
}

/// GET /api/messages?topic&brokerId&searchType&limit&from&to&query
pub async fn search_messages(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let start = Instant::now();
    let query = params.into_query()?;

    let outcome = state.inspector.search_messages(&query).await?;

    debug!(
        cluster_id = query.cluster_id,
        topic = %query.topic,
        returned = outcome.messages.len(),
        latency_ms = %start.elapsed().as_millis(),
        "Served message search"
    );
    Ok(Json(outcome.into()))
}

/// Body of a send request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub broker_id: ClusterId,
    #[serde(flatten)]
    pub message: OutgoingMessage,
}

/// POST /api/messages - Produces one message.
pub async fn send_message(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendRequest>,
) -> Result<Json<SentMessage>, ApiError> {
    let sent = state
        .inspector
        .send_message(request.broker_id, &request.message)
        .await?;
    Ok(Json(sent))
}
