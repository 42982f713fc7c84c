//! Checkout submission: cart snapshot in, persisted order out.
//!
//! One checkout submission is one logical unit of work:
//!
//! 1. validate the cart (non-empty, total agrees with what the client
//!    believes it is paying);
//! 2. initiate the payment on the chosen rail — for card and crypto
//!    this must complete before any row is written, so a provider
//!    failure leaves no order behind and the buyer retries from an
//!    unchanged cart;
//! 3. persist the order (header + line-item snapshot, one transaction)
//!    with status `pending`.
//!
//! A persistence failure after step 2 succeeded is the one state where
//! money may have moved with no local record; it is logged with the
//! provider reference and the attempted payload so an operator can
//! recover it, and surfaced as [`CheckoutError::Persistence`].

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::cart::Cart;
use crate::entities::{NewOrder, Order, ShippingAddress};
use crate::rails::{InitiatedPayment, PayeeSettings, RailError, RailRequest, Rails};
use crate::store::{OrderStore, StoreError};

/// Who is buying. `user_id` is `None` for guest checkouts; identity
/// verification belongs to the fronting auth layer.
#[derive(Debug, Clone)]
pub struct Buyer {
    pub name: String,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
}

/// Errors surfaced by a checkout submission.
///
/// On any of these the cart is untouched: the buyer retries without
/// re-entering items.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout attempted with no items; rejected before any I/O.
    #[error("cart is empty")]
    EmptyCart,

    /// The client-reported total disagrees with the total recomputed
    /// from the submitted line items.
    #[error("claimed total {claimed} does not match computed total {computed}")]
    TotalMismatch { claimed: Decimal, computed: Decimal },

    /// The payment provider was unreachable or rejected the request.
    /// No order was created.
    #[error("payment initiation failed: {0}")]
    ProviderInitiation(#[from] RailError),

    /// The order write failed after payment initiation succeeded.
    /// Requires manual reconciliation against the provider reference.
    #[error("order persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// A confirmed checkout result. Receiving this (and only this) is the
/// caller's signal that it is safe to clear the cart.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// Provider-hosted payment page, present on the card rail.
    pub redirect_url: Option<url::Url>,
    /// Payee details to display, present on the bank-transfer rail.
    pub instructions: Option<PayeeSettings>,
}

/// The order assembler: turns a validated cart plus payment context
/// into a persisted order.
#[derive(Clone)]
pub struct Checkout {
    store: Arc<dyn OrderStore>,
    rails: Rails,
}

impl Checkout {
    pub fn new(store: Arc<dyn OrderStore>, rails: Rails) -> Self {
        Self { store, rails }
    }

    /// Submit one checkout.
    ///
    /// `claimed_total` is what the client-side UI displayed to the
    /// buyer; when present it must match the total recomputed here
    /// from the line items, otherwise the submission is rejected
    /// before any provider call.
    pub async fn submit(
        &self,
        cart: &Cart,
        buyer: Buyer,
        shipping: ShippingAddress,
        rail: RailRequest,
        claimed_total: Option<Decimal>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let computed = cart.total();
        if let Some(claimed) = claimed_total {
            if claimed != computed {
                return Err(CheckoutError::TotalMismatch { claimed, computed });
            }
        }

        let order_id = Uuid::now_v7();
        let method = rail.method();

        tracing::info!(
            %order_id,
            %method,
            total = %computed,
            items = cart.len(),
            "initiating payment"
        );

        let InitiatedPayment {
            payment_ref,
            redirect_url,
            instructions,
        } = self
            .rails
            .initiate(order_id, cart, buyer.email.as_deref(), &rail)
            .await?;

        let new_order = NewOrder {
            order_id,
            customer_name: buyer.name,
            user_id: buyer.user_id,
            email: buyer.email,
            total: computed,
            payment_method: method,
            payment_ref: payment_ref.clone(),
            shipping,
            items: cart.to_line_items(),
        };

        let order = match self.store.insert(new_order.clone()).await {
            Ok(order) => order,
            Err(e) => {
                // The provider-side payment may exist with no local
                // record; keep enough context for manual recovery.
                tracing::error!(
                    error = %e,
                    %order_id,
                    %method,
                    payment_ref = %payment_ref,
                    total = %new_order.total,
                    customer = %new_order.customer_name,
                    "order persistence failed after payment initiation; \
                     manual reconciliation required"
                );
                return Err(CheckoutError::Persistence(e));
            }
        };

        tracing::info!(
            %order_id,
            %method,
            payment_ref = %order.payment_ref,
            "order created"
        );

        Ok(CheckoutOutcome {
            order,
            redirect_url,
            instructions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{OrderStatus, PaymentMethod};
    use crate::providers::testing::{ScriptedCardProvider, ScriptedCryptoProvider};
    use crate::rails::PayeeSettings;
    use crate::store::MemoryOrderStore;
    use compact_str::CompactString;
    use tokio::sync::RwLock;
    use url::Url;

    fn payee() -> Arc<RwLock<PayeeSettings>> {
        Arc::new(RwLock::new(PayeeSettings {
            phone_number: "0412-555-0199".to_string(),
            bank: "Harbour Mutual".to_string(),
            identification_number: "V-18443321".to_string(),
            holder_name: "Chandlery C.A.".to_string(),
        }))
    }

    fn checkout_with(
        card: Arc<ScriptedCardProvider>,
        crypto: Arc<ScriptedCryptoProvider>,
    ) -> (Checkout, Arc<MemoryOrderStore>) {
        let store = Arc::new(MemoryOrderStore::new());
        let rails = Rails::new(card, crypto, payee(), "usd".to_string());
        (Checkout::new(store.clone(), rails), store)
    }

    fn buyer() -> Buyer {
        Buyer {
            name: "Erik Larsen".to_string(),
            user_id: None,
            email: Some("erik@example.com".to_string()),
        }
    }

    fn pickup() -> ShippingAddress {
        ShippingAddress::Pickup {
            notice: "counter pickup, pier 4".to_string(),
        }
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_any_write() {
        let (checkout, store) = checkout_with(
            Arc::new(ScriptedCardProvider::healthy(0)),
            Arc::new(ScriptedCryptoProvider::with_status("PROCESSING")),
        );

        let err = checkout
            .submit(&Cart::new(), buyer(), pickup(), RailRequest::Cash, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn cash_checkout_creates_a_pending_order_with_exact_snapshot() {
        let (checkout, store) = checkout_with(
            Arc::new(ScriptedCardProvider::healthy(0)),
            Arc::new(ScriptedCryptoProvider::with_status("PROCESSING")),
        );

        let mut cart = Cart::new();
        cart.add("p1", "Deck brush", Decimal::new(1000, 2), 2);
        cart.add("p2", "Brass cleat", Decimal::new(550, 2), 1);

        let outcome = checkout
            .submit(
                &cart,
                buyer(),
                pickup(),
                RailRequest::Cash,
                Some(Decimal::new(2550, 2)),
            )
            .await
            .unwrap();

        let order = &outcome.order;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_method, PaymentMethod::Cash);
        assert_eq!(order.total, Decimal::new(2550, 2));
        assert!(order.payment_ref.starts_with("CASH-"));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].product_id, CompactString::from("p1"));
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[1].unit_price, Decimal::new(550, 2));

        // Persisted, readable back.
        let stored = store.get(order.order_id).await.unwrap().unwrap();
        assert_eq!(&stored, order);
    }

    #[tokio::test]
    async fn card_initiation_failure_creates_no_order() {
        let (checkout, store) = checkout_with(
            Arc::new(ScriptedCardProvider::unreachable()),
            Arc::new(ScriptedCryptoProvider::with_status("PROCESSING")),
        );

        let mut cart = Cart::new();
        cart.add("p1", "Deck brush", Decimal::new(1000, 2), 1);

        let err = checkout
            .submit(
                &cart,
                buyer(),
                pickup(),
                RailRequest::Card {
                    success_url: Url::parse("https://shop.example.com/success").unwrap(),
                    cancel_url: Url::parse("https://shop.example.com/cancel").unwrap(),
                },
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ProviderInitiation(_)));
        assert!(store.is_empty().await);
        // The cart is the caller's; nothing here mutated it.
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn claimed_total_mismatch_is_rejected_before_initiation() {
        let card = Arc::new(ScriptedCardProvider::healthy(0));
        let (checkout, store) = checkout_with(
            card.clone(),
            Arc::new(ScriptedCryptoProvider::with_status("PROCESSING")),
        );

        let mut cart = Cart::new();
        cart.add("p1", "Deck brush", Decimal::new(1000, 2), 1);

        let err = checkout
            .submit(
                &cart,
                buyer(),
                pickup(),
                RailRequest::Card {
                    success_url: Url::parse("https://shop.example.com/success").unwrap(),
                    cancel_url: Url::parse("https://shop.example.com/cancel").unwrap(),
                },
                Some(Decimal::new(100, 2)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::TotalMismatch { .. }));
        assert!(store.is_empty().await);
        assert_eq!(
            card.create_calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn crypto_checkout_stores_the_provider_reference() {
        let (checkout, _store) = checkout_with(
            Arc::new(ScriptedCardProvider::healthy(0)),
            Arc::new(ScriptedCryptoProvider::with_status("PROCESSING")),
        );

        let mut cart = Cart::new();
        cart.add("p1", "Deck brush", Decimal::new(1000, 2), 1);

        let outcome = checkout
            .submit(&cart, buyer(), pickup(), RailRequest::Crypto, None)
            .await
            .unwrap();

        assert_eq!(outcome.order.payment_method, PaymentMethod::Crypto);
        assert_eq!(outcome.order.payment_ref, "PRE-1");
        assert_eq!(outcome.order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn bank_transfer_checkout_returns_instructions() {
        let (checkout, _store) = checkout_with(
            Arc::new(ScriptedCardProvider::healthy(0)),
            Arc::new(ScriptedCryptoProvider::with_status("PROCESSING")),
        );

        let mut cart = Cart::new();
        cart.add("p1", "Deck brush", Decimal::new(1000, 2), 1);

        let outcome = checkout
            .submit(&cart, buyer(), pickup(), RailRequest::BankTransfer, None)
            .await
            .unwrap();

        let instructions = outcome.instructions.unwrap();
        assert_eq!(instructions.holder_name, "Chandlery C.A.");
        assert!(outcome.order.payment_ref.starts_with("XFER-"));
    }
}
