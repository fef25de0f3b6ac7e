//! Cluster registry endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use viewer_core::{Cluster, ClusterId};

use crate::extractors::ApiJson;
use crate::response::ApiError;
use crate::state::AppState;

/// GET /api/brokers
pub async fn list_brokers(State(state): State<AppState>) -> Json<Vec<Cluster>> {
    Json(state.inspector.list_clusters())
}

/// POST /api/brokers - Registers a cluster; an id of 0 is assigned.
pub async fn add_broker(
    State(state): State<AppState>,
    ApiJson(cluster): ApiJson<Cluster>,
) -> Result<(StatusCode, Json<Cluster>), ApiError> {
    let cluster = state.inspector.add_cluster(cluster)?;
    Ok((StatusCode::CREATED, Json(cluster)))
}

/// PUT /api/brokers - Replaces a cluster's settings.
pub async fn update_broker(
    State(state): State<AppState>,
    ApiJson(cluster): ApiJson<Cluster>,
) -> Result<Json<Cluster>, ApiError> {
    Ok(Json(state.inspector.update_cluster(cluster).await?))
}

/// DELETE /api/brokers/:id
pub async fn remove_broker(
    State(state): State<AppState>,
    Path(id): Path<ClusterId>,
) -> Result<StatusCode, ApiError> {
    state.inspector.remove_cluster(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
