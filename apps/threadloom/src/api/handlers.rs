//! # API Endpoint Handlers

use super::{
    AppState,
    types::{ChildrenResponse, ErrorResponse, HealthResponse, PostResponse, StatusResponse},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use threadloom_core::PostId;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Registry counts.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = StatusResponse::from(&state.registry.stats());
    (StatusCode::OK, Json(response))
}

// =============================================================================
// POST HANDLERS
// =============================================================================

/// Look up one post, concrete or placeholder.
pub async fn post_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let id = PostId(id);
    match state.registry.lookup(id) {
        Some(post) => (StatusCode::OK, Json(PostResponse::from(post))).into_response(),
        None => not_found(id),
    }
}

/// Children of one post, grouped by child kind.
pub async fn children_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let id = PostId(id);
    match state.registry.lookup(id) {
        Some(post) => (StatusCode::OK, Json(ChildrenResponse::from(post))).into_response(),
        None => not_found(id),
    }
}

fn not_found(id: PostId) -> Response {
    tracing::debug!(id = id.0, "post not found");
    (StatusCode::NOT_FOUND, Json(ErrorResponse::not_found(id))).into_response()
}
