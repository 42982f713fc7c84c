//! Admin API handlers.
//!
//! Back-office endpoints for staff, behind `Authorization: Bearer` with
//! the admin secret.
//!
//! # Endpoints
//!
//! - `GET    /orders`                    – list orders (paginated, filterable by status)
//! - `GET    /orders/{order_id}`         – fetch any order
//! - `PUT    /orders/{order_id}/status`  – override an order's status
//! - `DELETE /orders/{order_id}`         – delete an order
//! - `POST   /missing-references`        – report provider references with no local order

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use chandlery_core::store::StoreError;

use crate::state::AppState;

mod delete_order;
mod get_order;
mod list_orders;
mod missing_references;
mod update_status;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders::list_orders))
        .route("/orders/{order_id}", get(get_order::get_order))
        .route(
            "/orders/{order_id}/status",
            put(update_status::update_status),
        )
        .route("/orders/{order_id}", delete(delete_order::delete_order))
        .route(
            "/missing-references",
            post(missing_references::missing_references),
        )
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    Store(StoreError),
    NotFound,
}

impl From<StoreError> for AdminApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AdminApiError::NotFound,
            other => AdminApiError::Store(other),
        }
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::Store(e) => {
                tracing::error!(error = %e, "Admin API store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AdminApiError::NotFound => {
                (StatusCode::NOT_FOUND, "resource not found").into_response()
            }
        }
    }
}
