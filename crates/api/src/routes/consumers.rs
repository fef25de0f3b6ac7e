//! Consumer group listing.

use axum::{extract::State, Json};
use serde::Deserialize;
use viewer_core::{ConsumerFilter, ConsumerGroup};

use crate::extractors::ApiQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ConsumerParams {
    pub topic: Option<String>,
}

/// GET /api/consumers?topic= - Consumer groups with lag.
///
/// With a topic, each group is restricted to its partitions of that topic.
pub async fn list_consumers(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ConsumerParams>,
) -> Json<Vec<ConsumerGroup>> {
    let filter = ConsumerFilter {
        topic: params.topic,
    };
    Json(state.inspector.get_consumers(&filter).await)
}
