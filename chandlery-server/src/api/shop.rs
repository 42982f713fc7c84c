//! Buyer-facing endpoints: checkout submission, order lookup, the
//! order history list, on-demand reconciliation from the success page,
//! and the payee details for bank transfers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use chandlery_core::cart::Cart;
use chandlery_core::checkout::{Buyer, CheckoutError};
use chandlery_core::entities::{Order, OrderStatus, ShippingAddress};
use chandlery_core::rails::{PayeeSettings, RailRequest};
use chandlery_core::reconcile::{ReconcileError, ReconcileOutcome};
use chandlery_core::store::StoreError;

use crate::api::clamp_pagination;
use crate::api::extractors::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(submit_checkout))
        .route("/orders", get(list_orders))
        .route("/orders/{order_id}", get(get_order))
        .route("/orders/{order_id}/reconcile", post(reconcile_order))
        .route("/payee", get(get_payee))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Errors surfaced by the shop endpoints.
#[derive(Debug)]
pub enum ShopApiError {
    Checkout(CheckoutError),
    Reconcile(ReconcileError),
    Store(StoreError),
    OrderNotFound,
    SignInRequired,
}

impl From<CheckoutError> for ShopApiError {
    fn from(e: CheckoutError) -> Self {
        ShopApiError::Checkout(e)
    }
}

impl From<ReconcileError> for ShopApiError {
    fn from(e: ReconcileError) -> Self {
        ShopApiError::Reconcile(e)
    }
}

impl From<StoreError> for ShopApiError {
    fn from(e: StoreError) -> Self {
        ShopApiError::Store(e)
    }
}

impl IntoResponse for ShopApiError {
    fn into_response(self) -> Response {
        match self {
            ShopApiError::Checkout(CheckoutError::EmptyCart) => {
                (StatusCode::BAD_REQUEST, "cart is empty").into_response()
            }
            ShopApiError::Checkout(e @ CheckoutError::TotalMismatch { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            ShopApiError::Checkout(CheckoutError::ProviderInitiation(e)) => {
                tracing::warn!(error = %e, "payment initiation failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "payment provider is unavailable; your cart is unchanged, try again",
                )
                    .into_response()
            }
            ShopApiError::Checkout(CheckoutError::Persistence(e)) => {
                tracing::error!(error = %e, "order persistence failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "order could not be saved; contact support before paying again",
                )
                    .into_response()
            }
            ShopApiError::Reconcile(
                ReconcileError::OrderNotFound(_) | ReconcileError::ReferenceNotFound(_),
            )
            | ShopApiError::OrderNotFound => {
                (StatusCode::NOT_FOUND, "order not found").into_response()
            }
            ShopApiError::Reconcile(ReconcileError::Provider(e)) => {
                tracing::warn!(error = %e, "provider status query failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "payment provider is unavailable; try again shortly",
                )
                    .into_response()
            }
            ShopApiError::Reconcile(ReconcileError::Store(e)) | ShopApiError::Store(e) => {
                tracing::error!(error = %e, "order store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
            ShopApiError::SignInRequired => {
                (StatusCode::UNAUTHORIZED, "sign in to view order history").into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// POST /checkout
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Rail selection as submitted by the storefront.
#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum PaymentSelection {
    Card { success_url: Url, cancel_url: Url },
    Cash,
    BankTransfer,
    Crypto,
}

impl From<PaymentSelection> for RailRequest {
    fn from(selection: PaymentSelection) -> Self {
        match selection {
            PaymentSelection::Card {
                success_url,
                cancel_url,
            } => RailRequest::Card {
                success_url,
                cancel_url,
            },
            PaymentSelection::Cash => RailRequest::Cash,
            PaymentSelection::BankTransfer => RailRequest::BankTransfer,
            PaymentSelection::Crypto => RailRequest::Crypto,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutPayload {
    pub customer_name: String,
    /// Contact email; for logged-in buyers the forwarded identity email
    /// is used when this is absent.
    #[serde(default)]
    pub email: Option<String>,
    pub items: Vec<CheckoutItem>,
    pub shipping: ShippingAddress,
    pub payment: PaymentSelection,
    /// Total the storefront displayed to the buyer; rejected if it
    /// disagrees with the total recomputed server-side.
    #[serde(default)]
    pub claimed_total: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<PayeeSettings>,
}

async fn submit_checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CheckoutPayload>,
) -> Result<Json<CheckoutResponse>, ShopApiError> {
    let mut cart = Cart::new();
    for item in &payload.items {
        cart.add(
            item.product_id.as_str(),
            &item.name,
            item.unit_price,
            item.quantity,
        );
    }

    let buyer = Buyer {
        name: payload.customer_name,
        user_id: user.as_ref().map(|u| u.user_id),
        email: payload
            .email
            .or_else(|| user.and_then(|u| u.email)),
    };

    let outcome = state
        .checkout
        .submit(
            &cart,
            buyer,
            payload.shipping,
            payload.payment.into(),
            payload.claimed_total,
        )
        .await?;

    Ok(Json(CheckoutResponse {
        order: outcome.order,
        redirect_url: outcome.redirect_url,
        instructions: outcome.instructions,
    }))
}

// ---------------------------------------------------------------------------
// GET /orders/{order_id}
// ---------------------------------------------------------------------------

/// Fetch an order the caller is allowed to see.
///
/// Orders owned by a user are visible only to that user; guest orders
/// are addressable by their id alone. Ownership mismatches answer 404
/// rather than 403 so order ids leak nothing.
async fn fetch_visible_order(
    state: &AppState,
    user: &Option<crate::api::extractors::UserIdentity>,
    order_id: Uuid,
) -> Result<Order, ShopApiError> {
    let order = state
        .store
        .get(order_id)
        .await?
        .ok_or(ShopApiError::OrderNotFound)?;

    if let Some(owner) = order.user_id {
        let caller = user.as_ref().map(|u| u.user_id);
        if caller != Some(owner) {
            return Err(ShopApiError::OrderNotFound);
        }
    }
    Ok(order)
}

async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ShopApiError> {
    let order = fetch_visible_order(&state, &user, order_id).await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// GET /orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Order>>, ShopApiError> {
    let Some(user) = user else {
        return Err(ShopApiError::SignInRequired);
    };
    let (limit, offset) = clamp_pagination(params.limit, params.offset);
    let orders = state.store.list_for_user(user.user_id, limit, offset).await?;
    Ok(Json(orders))
}

// ---------------------------------------------------------------------------
// POST /orders/{order_id}/reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub outcome: &'static str,
    pub status: OrderStatus,
}

impl From<ReconcileOutcome> for ReconcileResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        match outcome {
            ReconcileOutcome::AlreadyTerminal(status) => ReconcileResponse {
                outcome: "already-terminal",
                status,
            },
            ReconcileOutcome::Pending => ReconcileResponse {
                outcome: "pending",
                status: OrderStatus::Pending,
            },
            ReconcileOutcome::Transitioned(status) => ReconcileResponse {
                outcome: "transitioned",
                status,
            },
        }
    }
}

/// Called by the success landing page so the buyer sees a settled
/// status immediately instead of waiting for the next poll.
async fn reconcile_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ReconcileResponse>, ShopApiError> {
    let order = fetch_visible_order(&state, &user, order_id).await?;
    let outcome = state.reconciler.reconcile_order(&order).await?;
    Ok(Json(outcome.into()))
}

// ---------------------------------------------------------------------------
// GET /payee
// ---------------------------------------------------------------------------

async fn get_payee(State(state): State<AppState>) -> Json<PayeeSettings> {
    Json(state.config.payee.read().await.clone())
}
