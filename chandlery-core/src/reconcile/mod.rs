//! Payment reconciliation.
//!
//! Reconciliation moves an order from `pending` to a terminal status
//! once the provider confirms (or buries) the payment. Two entry
//! points share the same logic:
//!
//! - on demand, when the success landing page asks about one order;
//! - in the background, from [`poller::ReconcilePoller`], so an order
//!   reaches its terminal state even if the buyer never returns from
//!   the provider's page.
//!
//! Safety comes from the store contract rather than locks: the status
//! write is a single conditional update out of `pending`, so repeated
//! or concurrent attempts are idempotent, a terminal state is never
//! left, and the status-changed event fires at most once per
//! transition.

pub mod poller;

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::entities::{Order, OrderStatus, PaymentMethod};
use crate::events::{OrderStatusChanged, OrderStatusChangedSender};
use crate::providers::{CardProvider, CryptoProvider, ProviderError};
use crate::rails::{interpret_card_session, interpret_crypto_order};
use crate::store::{OrderStore, StoreError};

pub use poller::{PollerSettings, ReconcilePoller};

/// Errors surfaced by a reconciliation attempt.
///
/// Provider failures here are retry-safe: reconciliation only reads
/// from the provider, so a failed query corrupts nothing.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("order store error: {0}")]
    Store(#[from] StoreError),

    #[error("provider status query failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("no order matches payment reference {0}")]
    ReferenceNotFound(String),
}

/// What a reconciliation attempt observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order was already terminal; the provider was not queried.
    AlreadyTerminal(OrderStatus),
    /// The provider has not settled yet, or the rail is confirmed by
    /// staff rather than a provider. The order stays pending.
    Pending,
    /// The order moved to the given terminal status.
    Transitioned(OrderStatus),
}

/// Queries providers and applies canonical status transitions.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn OrderStore>,
    card: Arc<dyn CardProvider>,
    crypto: Arc<dyn CryptoProvider>,
    events: OrderStatusChangedSender,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        card: Arc<dyn CardProvider>,
        crypto: Arc<dyn CryptoProvider>,
        events: OrderStatusChangedSender,
    ) -> Self {
        Self {
            store,
            card,
            crypto,
            events,
        }
    }

    /// Reconcile one order by id.
    pub async fn reconcile(&self, order_id: Uuid) -> Result<ReconcileOutcome, ReconcileError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(ReconcileError::OrderNotFound(order_id))?;
        self.reconcile_order(&order).await
    }

    /// Reconcile one order by its provider payment reference.
    pub async fn reconcile_by_payment_ref(
        &self,
        payment_ref: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let order = self
            .store
            .get_by_payment_ref(payment_ref)
            .await?
            .ok_or_else(|| ReconcileError::ReferenceNotFound(payment_ref.to_string()))?;
        self.reconcile_order(&order).await
    }

    /// Core reconciliation step against an already-fetched order.
    pub async fn reconcile_order(
        &self,
        order: &Order,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if order.status.is_terminal() {
            return Ok(ReconcileOutcome::AlreadyTerminal(order.status));
        }

        let interpreted = match order.payment_method {
            PaymentMethod::Card => {
                let session = self.card.retrieve_session(&order.payment_ref).await?;
                interpret_card_session(&session)
            }
            PaymentMethod::Crypto => {
                let state = self.crypto.query_order(&order.payment_ref).await?;
                interpret_crypto_order(&state)
            }
            // Cash and bank transfer are settled by staff; automated
            // reconciliation never touches them.
            PaymentMethod::Cash | PaymentMethod::BankTransfer => None,
        };

        let Some(new_status) = interpreted else {
            return Ok(ReconcileOutcome::Pending);
        };

        let changed = self
            .store
            .transition_from_pending(order.order_id, new_status)
            .await?;

        if !changed {
            // Someone else settled this order between our read and the
            // conditional write; report what is actually stored now.
            let current = self
                .store
                .get(order.order_id)
                .await?
                .ok_or(ReconcileError::OrderNotFound(order.order_id))?;
            return Ok(ReconcileOutcome::AlreadyTerminal(current.status));
        }

        tracing::info!(
            order_id = %order.order_id,
            method = %order.payment_method,
            payment_ref = %order.payment_ref,
            new_status = %new_status,
            "order reconciled"
        );

        let event = OrderStatusChanged {
            order_id: order.order_id,
            new_status,
        };
        if let Err(e) = self.events.send(event).await {
            tracing::error!(
                order_id = %order.order_id,
                error = %e,
                "failed to emit OrderStatusChanged event"
            );
        }

        Ok(ReconcileOutcome::Transitioned(new_status))
    }

    /// Operational recovery report: which of the given provider
    /// references have no matching local order.
    ///
    /// Fed with a reference export from a provider dashboard, this
    /// surfaces payments that moved money without a local record
    /// (initiation succeeded, persistence failed).
    pub async fn missing_references(
        &self,
        payment_refs: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let mut missing = Vec::new();
        for payment_ref in payment_refs {
            if self.store.get_by_payment_ref(payment_ref).await?.is_none() {
                missing.push(payment_ref.clone());
            }
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{NewOrder, ShippingAddress};
    use crate::events::order_status_changed_channel;
    use crate::providers::testing::{ScriptedCardProvider, ScriptedCryptoProvider};
    use crate::store::MemoryOrderStore;
    use rust_decimal::Decimal;
    use std::sync::atomic::Ordering;

    struct Fixture {
        store: Arc<MemoryOrderStore>,
        card: Arc<ScriptedCardProvider>,
        crypto: Arc<ScriptedCryptoProvider>,
        reconciler: Reconciler,
        events_rx: crate::events::OrderStatusChangedReceiver,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryOrderStore::new());
        let card = Arc::new(ScriptedCardProvider::healthy(2550));
        let crypto = Arc::new(ScriptedCryptoProvider::with_status("PROCESSING"));
        let (events_tx, events_rx) = order_status_changed_channel();
        let reconciler = Reconciler::new(store.clone(), card.clone(), crypto.clone(), events_tx);
        Fixture {
            store,
            card,
            crypto,
            reconciler,
            events_rx,
        }
    }

    async fn insert_order(
        store: &MemoryOrderStore,
        method: PaymentMethod,
        payment_ref: &str,
    ) -> Uuid {
        let order_id = Uuid::now_v7();
        store
            .insert(NewOrder {
                order_id,
                customer_name: "Erik Larsen".to_string(),
                user_id: None,
                email: None,
                total: Decimal::new(2550, 2),
                payment_method: method,
                payment_ref: payment_ref.to_string(),
                shipping: ShippingAddress::Pickup {
                    notice: "pier 4".to_string(),
                },
                items: vec![],
            })
            .await
            .unwrap();
        order_id
    }

    #[tokio::test]
    async fn paid_crypto_order_completes_and_repolling_is_idempotent() {
        let mut fx = fixture();
        let order_id = insert_order(&fx.store, PaymentMethod::Crypto, "REF123").await;
        fx.crypto.set_status("PAID");

        let outcome = fx.reconciler.reconcile(order_id).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Transitioned(OrderStatus::Completed)
        );
        let stored = fx.store.get(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);

        // Second poll with the same provider payload: terminal no-op,
        // the provider is not even queried again.
        let queries_before = fx.crypto.query_calls.load(Ordering::SeqCst);
        let outcome = fx.reconciler.reconcile(order_id).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::AlreadyTerminal(OrderStatus::Completed)
        );
        assert_eq!(fx.crypto.query_calls.load(Ordering::SeqCst), queries_before);

        // Exactly one status-changed event was emitted.
        let event = fx.events_rx.recv().await.unwrap();
        assert_eq!(event.order_id, order_id);
        assert_eq!(event.new_status, OrderStatus::Completed);
        assert!(fx.events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_crypto_statuses_map_to_failed() {
        for provider_status in ["CANCELLED", "ERROR", "EXPIRED"] {
            let fx = fixture();
            let order_id = insert_order(&fx.store, PaymentMethod::Crypto, "REF123").await;
            fx.crypto.set_status(provider_status);

            let outcome = fx.reconciler.reconcile(order_id).await.unwrap();
            assert_eq!(outcome, ReconcileOutcome::Transitioned(OrderStatus::Failed));
        }
    }

    #[tokio::test]
    async fn unknown_provider_status_leaves_the_order_pending() {
        let fx = fixture();
        let order_id = insert_order(&fx.store, PaymentMethod::Crypto, "REF123").await;
        fx.crypto.set_status("PROCESSING");

        let outcome = fx.reconciler.reconcile(order_id).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Pending);
        let stored = fx.store.get(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn terminal_orders_are_never_touched_regardless_of_payload() {
        for terminal in [
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
        ] {
            let fx = fixture();
            let order_id = insert_order(&fx.store, PaymentMethod::Crypto, "REF123").await;
            fx.store.override_status(order_id, terminal).await.unwrap();
            fx.crypto.set_status("PAID");

            let outcome = fx.reconciler.reconcile(order_id).await.unwrap();
            assert_eq!(outcome, ReconcileOutcome::AlreadyTerminal(terminal));
            assert_eq!(fx.crypto.query_calls.load(Ordering::SeqCst), 0);

            let stored = fx.store.get(order_id).await.unwrap().unwrap();
            assert_eq!(stored.status, terminal);
        }
    }

    #[tokio::test]
    async fn card_session_expiry_cancels_the_order() {
        let fx = fixture();
        let order_id = insert_order(&fx.store, PaymentMethod::Card, "cs_123").await;
        fx.card.set_session_status("expired");

        let outcome = fx.reconciler.reconcile(order_id).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Transitioned(OrderStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn reconcile_by_payment_ref_finds_the_order() {
        let fx = fixture();
        insert_order(&fx.store, PaymentMethod::Card, "cs_777").await;
        fx.card.set_session_status("complete");

        let outcome = fx
            .reconciler
            .reconcile_by_payment_ref("cs_777")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Transitioned(OrderStatus::Completed)
        );

        let err = fx
            .reconciler
            .reconcile_by_payment_ref("cs_unknown")
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ReferenceNotFound(_)));
    }

    #[tokio::test]
    async fn staff_confirmed_rails_stay_pending() {
        let fx = fixture();
        let order_id = insert_order(&fx.store, PaymentMethod::Cash, "CASH-1").await;

        let outcome = fx.reconciler.reconcile(order_id).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Pending);
    }

    #[tokio::test]
    async fn missing_references_reports_unmatched_provider_refs() {
        let fx = fixture();
        insert_order(&fx.store, PaymentMethod::Card, "cs_known").await;

        let missing = fx
            .reconciler
            .missing_references(&[
                "cs_known".to_string(),
                "cs_orphan_1".to_string(),
                "cs_orphan_2".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(missing, vec!["cs_orphan_1", "cs_orphan_2"]);
    }
}
