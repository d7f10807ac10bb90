//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{ErrorResponse, HealthResponse, IndexResponse, error_status},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use knotes_core::{DocumentStore, Knote, ParamMap};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// SEARCH HANDLER
// =============================================================================

/// Search entities by query parameters.
///
/// Parameters arrive as repeatable key=value pairs (`q`, `facet.<field>`,
/// `relationship.<type>`); the raw pair list is folded into the core's
/// multi-valued map so repeated keys accumulate instead of overwriting.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let mut params = ParamMap::new();
    for (key, value) in pairs {
        params.entry(key).or_default().push(value);
    }

    let engine = state.engine.read().await;
    match engine.search(&params) {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => (
            error_status(&e),
            Json(ErrorResponse::new(format!("Search failed: {}", e))),
        )
            .into_response(),
    }
}

// =============================================================================
// INDEX HANDLER
// =============================================================================

/// Index an entity.
///
/// The body is the entity's wire document; decoding re-validates it, so a
/// malformed or oversized entity is rejected here before any write.
pub async fn index_handler(
    State(state): State<AppState>,
    Json(document): Json<knotes_core::Document>,
) -> impl IntoResponse {
    let knote = match Knote::from_document(&document) {
        Ok(k) => k,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(IndexResponse::error(format!("Invalid entity: {}", e))),
            );
        }
    };

    let mut engine = state.engine.write().await;
    match engine.index(&knote) {
        Ok(result) => (StatusCode::OK, Json(IndexResponse::success(&result))),
        Err(e) => (
            error_status(&e),
            Json(IndexResponse::error(format!("Index failed: {}", e))),
        ),
    }
}

// =============================================================================
// GET HANDLER
// =============================================================================

/// Fetch one entity by id.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let engine = state.engine.read().await;
    let index_name = engine.index_name().to_string();
    match engine.store().get(&index_name, &id) {
        Ok(Some(versioned)) => (StatusCode::OK, Json(versioned.source)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("No entity with id '{}'", id))),
        )
            .into_response(),
        Err(e) => (
            error_status(&e),
            Json(ErrorResponse::new(format!("Lookup failed: {}", e))),
        )
            .into_response(),
    }
}

// =============================================================================
// MAPPING HANDLER
// =============================================================================

/// Index schema introspection.
pub async fn mapping_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.read().await;
    match engine.schema() {
        Ok(mapping) => (StatusCode::OK, Json(mapping)).into_response(),
        Err(e) => (
            error_status(&e),
            Json(ErrorResponse::new(format!("Mapping lookup failed: {}", e))),
        )
            .into_response(),
    }
}
