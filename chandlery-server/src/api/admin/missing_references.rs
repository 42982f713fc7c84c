use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::AdminApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct MissingReferencesPayload {
    /// Payment references exported from a provider dashboard.
    pub payment_refs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MissingReferencesResponse {
    /// References with no matching local order; each one is a payment
    /// that may have moved money without a record here.
    pub missing: Vec<String>,
}

/// `POST /missing-references` — recovery report for orphaned payments.
pub(crate) async fn missing_references(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Json(payload): Json<MissingReferencesPayload>,
) -> Result<impl IntoResponse, AdminApiError> {
    let missing = state
        .reconciler
        .missing_references(&payload.payment_refs)
        .await?;
    Ok(Json(MissingReferencesResponse { missing }))
}
