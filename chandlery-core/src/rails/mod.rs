//! Payment rail adapters.
//!
//! One dispatch point over the four supported rails. Each rail knows
//! two things: how to initiate a payment with its provider, and how to
//! translate the provider's status vocabulary into the canonical
//! [`OrderStatus`] one.
//!
//! Rail semantics:
//!
//! - **Card** — opens a hosted checkout session; the buyer is
//!   redirected to the provider's page and confirmation arrives
//!   asynchronously.
//! - **Cash** — no external call; a locally minted reference token,
//!   confirmed by staff at pickup.
//! - **Bank transfer** — no external call; returns the
//!   admin-configured payee details, reconciled manually against the
//!   bank statement.
//! - **Crypto** — creates a provider prepay order keyed by our order
//!   id; confirmation requires explicit polling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use crate::cart::Cart;
use crate::entities::{OrderStatus, PaymentMethod};
use crate::providers::{
    CardProvider, CardSessionState, CreateSessionRequest, CryptoOrderState, CryptoProvider,
    ProviderError, SessionLineItem,
};
use crate::utils::minor_units::{MinorUnitError, to_minor_units};
use crate::utils::reference::local_payment_ref;

/// Admin-configured payee details shown to bank-transfer buyers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeSettings {
    pub phone_number: String,
    pub bank: String,
    pub identification_number: String,
    pub holder_name: String,
}

/// Rail selection with its rail-specific payload.
#[derive(Debug, Clone)]
pub enum RailRequest {
    Card { success_url: Url, cancel_url: Url },
    Cash,
    BankTransfer,
    Crypto,
}

impl RailRequest {
    pub fn method(&self) -> PaymentMethod {
        match self {
            RailRequest::Card { .. } => PaymentMethod::Card,
            RailRequest::Cash => PaymentMethod::Cash,
            RailRequest::BankTransfer => PaymentMethod::BankTransfer,
            RailRequest::Crypto => PaymentMethod::Crypto,
        }
    }
}

/// Result of a successful `initiate` call.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    /// Rail-specific external reference persisted on the order.
    pub payment_ref: String,
    /// Provider-hosted page to send the buyer to (card only).
    pub redirect_url: Option<Url>,
    /// Payee details to display (bank transfer only).
    pub instructions: Option<PayeeSettings>,
}

/// Errors produced while initiating a payment.
#[derive(Debug, Error)]
pub enum RailError {
    #[error("payment provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid amount: {0}")]
    Amount(#[from] MinorUnitError),
}

/// The configured rail set: provider handles plus payee settings.
///
/// Cheap to clone; the payee settings sit behind a lock so a config
/// reload takes effect without rebuilding the rails.
#[derive(Clone)]
pub struct Rails {
    card: Arc<dyn CardProvider>,
    crypto: Arc<dyn CryptoProvider>,
    payee: Arc<RwLock<PayeeSettings>>,
    currency: String,
}

impl Rails {
    pub fn new(
        card: Arc<dyn CardProvider>,
        crypto: Arc<dyn CryptoProvider>,
        payee: Arc<RwLock<PayeeSettings>>,
        currency: String,
    ) -> Self {
        Self {
            card,
            crypto,
            payee,
            currency,
        }
    }

    pub fn card_provider(&self) -> Arc<dyn CardProvider> {
        self.card.clone()
    }

    pub fn crypto_provider(&self) -> Arc<dyn CryptoProvider> {
        self.crypto.clone()
    }

    pub async fn payee_settings(&self) -> PayeeSettings {
        self.payee.read().await.clone()
    }

    /// Initiate a payment on the requested rail.
    ///
    /// Fails without side effects on our side: no order exists yet at
    /// this point, so a provider failure leaves nothing to clean up.
    pub async fn initiate(
        &self,
        order_id: Uuid,
        cart: &Cart,
        customer_email: Option<&str>,
        request: &RailRequest,
    ) -> Result<InitiatedPayment, RailError> {
        match request {
            RailRequest::Card {
                success_url,
                cancel_url,
            } => {
                let line_items = self.session_line_items(cart)?;
                let session = self
                    .card
                    .create_session(&CreateSessionRequest {
                        line_items,
                        success_url: success_url.clone(),
                        cancel_url: cancel_url.clone(),
                        customer_email: customer_email.map(str::to_owned),
                        order_id,
                    })
                    .await?;
                Ok(InitiatedPayment {
                    payment_ref: session.session_id,
                    redirect_url: Some(session.redirect_url),
                    instructions: None,
                })
            }
            RailRequest::Cash => Ok(InitiatedPayment {
                payment_ref: local_payment_ref("CASH"),
                redirect_url: None,
                instructions: None,
            }),
            RailRequest::BankTransfer => Ok(InitiatedPayment {
                payment_ref: local_payment_ref("XFER"),
                redirect_url: None,
                instructions: Some(self.payee.read().await.clone()),
            }),
            RailRequest::Crypto => {
                let prepay = self
                    .crypto
                    .create_prepay(cart.total(), &order_id.to_string())
                    .await?;
                Ok(InitiatedPayment {
                    payment_ref: prepay.prepay_id,
                    redirect_url: None,
                    instructions: None,
                })
            }
        }
    }

    /// Translate cart lines 1:1 into the card provider's line-item
    /// schema, with unit amounts in integer minor units.
    fn session_line_items(&self, cart: &Cart) -> Result<Vec<SessionLineItem>, RailError> {
        cart.items()
            .iter()
            .map(|item| {
                Ok(SessionLineItem {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_amount: to_minor_units(item.unit_price)?,
                    currency: self.currency.clone(),
                })
            })
            .collect()
    }
}

/// Map a hosted-checkout session payload onto the canonical status.
///
/// `None` means the provider has not settled yet and the order stays
/// pending.
pub fn interpret_card_session(state: &CardSessionState) -> Option<OrderStatus> {
    match state.payment_intent_status.as_str() {
        "paid" | "succeeded" => return Some(OrderStatus::Completed),
        _ => {}
    }
    match state.status.as_str() {
        "complete" | "paid" => Some(OrderStatus::Completed),
        "expired" | "canceled" | "cancelled" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}

/// Map a crypto prepay-order payload onto the canonical status.
pub fn interpret_crypto_order(state: &CryptoOrderState) -> Option<OrderStatus> {
    match state.data.status.as_str() {
        "PAID" => Some(OrderStatus::Completed),
        "CANCELLED" | "ERROR" | "EXPIRED" => Some(OrderStatus::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CryptoOrderData;
    use crate::providers::testing::{ScriptedCardProvider, ScriptedCryptoProvider};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    fn payee() -> Arc<RwLock<PayeeSettings>> {
        Arc::new(RwLock::new(PayeeSettings {
            phone_number: "0412-555-0199".to_string(),
            bank: "Harbour Mutual".to_string(),
            identification_number: "V-18443321".to_string(),
            holder_name: "Chandlery C.A.".to_string(),
        }))
    }

    fn crypto_state(status: &str) -> CryptoOrderState {
        CryptoOrderState {
            status: "SUCCESS".to_string(),
            data: CryptoOrderData {
                status: status.to_string(),
            },
        }
    }

    fn card_state(status: &str, intent: &str) -> CardSessionState {
        CardSessionState {
            status: status.to_string(),
            amount_total: 0,
            payment_intent_status: intent.to_string(),
        }
    }

    #[test]
    fn crypto_status_mapping() {
        assert_eq!(
            interpret_crypto_order(&crypto_state("PAID")),
            Some(OrderStatus::Completed)
        );
        for failed in ["CANCELLED", "ERROR", "EXPIRED"] {
            assert_eq!(
                interpret_crypto_order(&crypto_state(failed)),
                Some(OrderStatus::Failed)
            );
        }
        assert_eq!(interpret_crypto_order(&crypto_state("PROCESSING")), None);
        assert_eq!(interpret_crypto_order(&crypto_state("")), None);
    }

    #[test]
    fn card_status_mapping() {
        assert_eq!(
            interpret_card_session(&card_state("complete", "paid")),
            Some(OrderStatus::Completed)
        );
        assert_eq!(
            interpret_card_session(&card_state("expired", "requires_payment")),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(
            interpret_card_session(&card_state("canceled", "requires_payment")),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(
            interpret_card_session(&card_state("open", "requires_payment")),
            None
        );
    }

    /// Card provider that records the session request it was given.
    struct CapturingCardProvider {
        captured: Mutex<Option<CreateSessionRequest>>,
    }

    #[async_trait]
    impl CardProvider for CapturingCardProvider {
        async fn create_session(
            &self,
            req: &CreateSessionRequest,
        ) -> Result<crate::providers::CardSession, ProviderError> {
            *self.captured.lock().unwrap() = Some(req.clone());
            Ok(crate::providers::CardSession {
                session_id: "cs_captured".to_string(),
                redirect_url: Url::parse("https://pay.example.com/s/cs_captured").unwrap(),
            })
        }

        async fn retrieve_session(
            &self,
            _session_id: &str,
        ) -> Result<CardSessionState, ProviderError> {
            Ok(card_state("open", "requires_payment"))
        }
    }

    #[tokio::test]
    async fn card_initiate_converts_prices_to_minor_units() {
        let card = Arc::new(CapturingCardProvider {
            captured: Mutex::new(None),
        });
        let rails = Rails::new(
            card.clone(),
            Arc::new(ScriptedCryptoProvider::with_status("PROCESSING")),
            payee(),
            "usd".to_string(),
        );

        let mut cart = Cart::new();
        // 19.995 rounds half-up to 20.00 -> 2000 minor units.
        cart.add("chart-101", "Harbour chart", Decimal::new(19_995, 3), 1);
        cart.add("rope-30m", "Mooring rope 30m", Decimal::new(1_050, 2), 2);

        let initiated = rails
            .initiate(
                Uuid::now_v7(),
                &cart,
                Some("buyer@example.com"),
                &RailRequest::Card {
                    success_url: Url::parse("https://shop.example.com/success").unwrap(),
                    cancel_url: Url::parse("https://shop.example.com/cancel").unwrap(),
                },
            )
            .await
            .unwrap();

        assert_eq!(initiated.payment_ref, "cs_captured");
        assert!(initiated.redirect_url.is_some());

        let req = card.captured.lock().unwrap().clone().unwrap();
        assert_eq!(req.line_items[0].unit_amount, 2000);
        assert_eq!(req.line_items[1].unit_amount, 1050);

        // Minor-unit sum reconstructs the rounded cart total.
        let minor_sum: i64 = req
            .line_items
            .iter()
            .map(|li| li.unit_amount * i64::from(li.quantity))
            .sum();
        assert_eq!(minor_sum, 2000 + 2 * 1050);
    }

    #[tokio::test]
    async fn bank_transfer_initiate_returns_payee_instructions() {
        let rails = Rails::new(
            Arc::new(ScriptedCardProvider::healthy(0)),
            Arc::new(ScriptedCryptoProvider::with_status("PROCESSING")),
            payee(),
            "usd".to_string(),
        );

        let mut cart = Cart::new();
        cart.add("p1", "P1", Decimal::from(10), 1);

        let initiated = rails
            .initiate(Uuid::now_v7(), &cart, None, &RailRequest::BankTransfer)
            .await
            .unwrap();

        assert!(initiated.payment_ref.starts_with("XFER-"));
        assert_eq!(
            initiated.instructions.unwrap().bank,
            "Harbour Mutual".to_string()
        );
    }

    #[tokio::test]
    async fn crypto_initiate_uses_the_order_id_as_reference() {
        let crypto = Arc::new(ScriptedCryptoProvider::with_status("PROCESSING"));
        let rails = Rails::new(
            Arc::new(ScriptedCardProvider::healthy(0)),
            crypto,
            payee(),
            "usd".to_string(),
        );

        let mut cart = Cart::new();
        cart.add("p1", "P1", Decimal::from(25), 1);

        let initiated = rails
            .initiate(Uuid::now_v7(), &cart, None, &RailRequest::Crypto)
            .await
            .unwrap();

        assert_eq!(initiated.payment_ref, "PRE-1");
        assert!(initiated.redirect_url.is_none());
    }
}
