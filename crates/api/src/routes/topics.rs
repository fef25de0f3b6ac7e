//! Topic listing and partition view.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use viewer_core::{ClusterId, TopicFilter, TopicInfo, TopicPartitions};

use crate::extractors::ApiQuery;
use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TopicParams {
    pub name: Option<String>,
}

/// GET /api/topics?name= - Topics of every active cluster.
pub async fn list_topics(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TopicParams>,
) -> Json<Vec<TopicInfo>> {
    let filter = TopicFilter { name: params.name };
    Json(state.inspector.get_topics(&filter).await)
}

/// GET /api/topics/:cluster_id/:topic/partitions
pub async fn topic_partitions(
    State(state): State<AppState>,
    Path((cluster_id, topic)): Path<(ClusterId, String)>,
) -> Result<Json<TopicPartitions>, ApiError> {
    let partitions = state
        .inspector
        .get_topic_partitions(cluster_id, &topic)
        .await?;
    Ok(Json(partitions))
}
