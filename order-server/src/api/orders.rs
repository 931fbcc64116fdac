//! Order read endpoints
//!
//! Pure translation layer: the cache result becomes either the serialized
//! entity, a not-found shape, or a generic failure shape. Internal error
//! detail is logged here and never leaks to the caller.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ServiceError;
use crate::state::AppState;

/// GET /api/order/{id}
pub async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.cache.get_by_id(&id).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(ServiceError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "order not found"})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(order_uid = %id, error = %e, "failed to get order");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response()
        }
    }
}

/// GET /api/orders
pub async fn list_orders(State(state): State<AppState>) -> Response {
    match state.cache.list_previews().await {
        Ok(previews) => (StatusCode::OK, Json(previews)).into_response(),
        Err(ServiceError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "orders preview not found"})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list order previews");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal server error"})),
            )
                .into_response()
        }
    }
}
