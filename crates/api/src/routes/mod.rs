//! API routes.

pub mod brokers;
pub mod consumers;
pub mod health;
pub mod messages;
pub mod metrics;
pub mod topics;

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/topics", get(topics::list_topics))
        .route(
            "/api/topics/:cluster_id/:topic/partitions",
            get(topics::topic_partitions),
        )
        .route(
            "/api/messages",
            get(messages::search_messages).post(messages::send_message),
        )
        .route("/api/consumers", get(consumers::list_consumers))
        .route(
            "/api/brokers",
            get(brokers::list_brokers)
                .post(brokers::add_broker)
                .put(brokers::update_broker),
        )
        .route("/api/brokers/:id", delete(brokers::remove_broker))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("no such route")
}
