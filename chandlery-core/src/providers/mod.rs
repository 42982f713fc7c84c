//! Payment provider collaborators.
//!
//! The card and crypto providers are external black boxes: this module
//! fixes their request/response shapes and hides the rest behind
//! traits so the checkout and reconciliation paths can be exercised
//! against scripted implementations.

pub mod card;
pub mod crypto;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

pub use card::HostedCheckoutClient;
pub use crypto::CryptoPayClient;

/// Errors surfaced by a payment provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not be reached or the transport failed.
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// One line item in the card provider's session schema. Amounts are in
/// integer minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_amount: i64,
    pub currency: String,
}

/// Request to open a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub line_items: Vec<SessionLineItem>,
    pub success_url: Url,
    pub cancel_url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /// Our order id, echoed back in provider metadata.
    pub order_id: Uuid,
}

/// A freshly created hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CardSession {
    pub session_id: String,
    pub redirect_url: Url,
}

/// Provider-side view of an existing session.
#[derive(Debug, Clone, Deserialize)]
pub struct CardSessionState {
    pub status: String,
    pub amount_total: i64,
    pub payment_intent_status: String,
}

/// A provider-side prepay order for the crypto rail.
#[derive(Debug, Clone, Deserialize)]
pub struct CryptoPrepay {
    pub prepay_id: String,
}

/// Provider-side view of a crypto prepay order. The inner `data.status`
/// carries the payment outcome vocabulary (`PAID`, `CANCELLED`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct CryptoOrderState {
    pub status: String,
    pub data: CryptoOrderData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CryptoOrderData {
    pub status: String,
}

/// Card payment provider capability: hosted checkout sessions.
#[async_trait]
pub trait CardProvider: Send + Sync {
    async fn create_session(&self, req: &CreateSessionRequest)
    -> Result<CardSession, ProviderError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<CardSessionState, ProviderError>;
}

/// Crypto payment provider capability: prepay orders with explicit
/// status polling (this integration receives no webhooks).
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    async fn create_prepay(
        &self,
        amount: Decimal,
        reference: &str,
    ) -> Result<CryptoPrepay, ProviderError>;

    async fn query_order(&self, prepay_id: &str) -> Result<CryptoOrderState, ProviderError>;
}
