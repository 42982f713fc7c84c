use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

/// `GET /orders/{order_id}` — fetch any order, regardless of owner.
pub(crate) async fn get_order(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let order = state
        .store
        .get(order_id)
        .await?
        .ok_or(AdminApiError::NotFound)?;
    Ok(Json(order))
}
