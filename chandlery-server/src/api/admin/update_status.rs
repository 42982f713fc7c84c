use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use chandlery_core::entities::OrderStatus;
use chandlery_core::events::OrderStatusChanged;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateStatusPayload {
    pub status: OrderStatus,
}

/// `PUT /orders/{order_id}/status` — override an order's status.
///
/// This is the manual settlement path for the staff-confirmed rails
/// (cash at pickup, bank transfer against the statement) and the escape
/// hatch for provider disputes. Unlike reconciliation it writes
/// unconditionally, so it can also move an order out of a terminal
/// state.
pub(crate) async fn update_status(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AdminApiError> {
    let order = state
        .store
        .get(order_id)
        .await?
        .ok_or(AdminApiError::NotFound)?;

    if order.status == payload.status {
        return Ok(Json(order));
    }

    state.store.override_status(order_id, payload.status).await?;

    tracing::info!(
        %order_id,
        old_status = %order.status,
        new_status = %payload.status,
        "order status overridden by admin"
    );

    if let Err(e) = state
        .events_tx
        .send(OrderStatusChanged {
            order_id,
            new_status: payload.status,
        })
        .await
    {
        tracing::error!(%order_id, error = %e, "failed to emit OrderStatusChanged event");
    }

    let updated = state
        .store
        .get(order_id)
        .await?
        .ok_or(AdminApiError::NotFound)?;
    Ok(Json(updated))
}
