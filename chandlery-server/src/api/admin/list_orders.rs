use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use chandlery_core::entities::OrderStatus;
use chandlery_core::store::OrderFilter;

use crate::api::clamp_pagination;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct ListOrdersQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

/// `GET /orders` — list orders with pagination and an optional status
/// filter.
pub(crate) async fn list_orders(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);
    let orders = state
        .store
        .list(
            OrderFilter {
                status: query.status,
            },
            limit,
            offset,
        )
        .await?;
    Ok(Json(orders))
}
