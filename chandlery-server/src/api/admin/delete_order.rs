use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

/// `DELETE /orders/{order_id}` — delete an order and its line items.
///
/// The only deletion path in the system; buyers can never delete.
pub(crate) async fn delete_order(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    state.store.delete(order_id).await?;
    tracing::info!(%order_id, "order deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}
