//! Background reconciliation poller.
//!
//! The crypto provider pushes no webhooks in this integration, and a
//! card buyer may abandon the hosted page without ever landing on the
//! success URL, so pending card and crypto orders are scanned on an
//! interval and reconciled server-side. User-page visits are an
//! optimization, never the only path to a terminal state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info};

use crate::entities::PaymentMethod;
use crate::store::OrderStore;

use super::{ReconcileOutcome, Reconciler};

/// Runtime-tunable poller settings (SIGHUP-reloadable).
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Delay between scans.
    pub interval: Duration,
    /// Maximum pending orders reconciled per scan.
    pub batch_size: i64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 50,
        }
    }
}

/// Rails the poller scans: the provider-confirmed ones.
const POLLED_METHODS: [PaymentMethod; 2] = [PaymentMethod::Card, PaymentMethod::Crypto];

pub struct ReconcilePoller {
    store: Arc<dyn OrderStore>,
    reconciler: Reconciler,
    settings: Arc<RwLock<PollerSettings>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ReconcilePoller {
    pub fn new(
        store: Arc<dyn OrderStore>,
        reconciler: Reconciler,
        settings: Arc<RwLock<PollerSettings>>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            reconciler,
            settings,
            shutdown_rx,
        }
    }

    /// Run the poller until shutdown is signalled.
    pub async fn run(mut self) {
        info!("ReconcilePoller started");

        loop {
            let interval = self.settings.read().await.interval;

            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("ReconcilePoller received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(interval) => {
                    match self.poll_once().await {
                        Ok(transitioned) if transitioned > 0 => {
                            info!(transitioned, "reconciliation scan settled orders");
                        }
                        Ok(_) => {
                            debug!("reconciliation scan found nothing to settle");
                        }
                        Err(e) => {
                            error!(error = %e, "reconciliation scan failed");
                        }
                    }
                }
            }
        }

        info!("ReconcilePoller shutdown complete");
    }

    /// One reconciliation scan. Returns how many orders reached a
    /// terminal state.
    ///
    /// Per-order provider failures are logged and skipped; one flaky
    /// provider response must not starve the rest of the batch.
    pub async fn poll_once(&self) -> Result<usize, super::ReconcileError> {
        let batch_size = self.settings.read().await.batch_size;
        let pending = self.store.list_pending(&POLLED_METHODS, batch_size).await?;

        let mut transitioned = 0usize;
        for order in &pending {
            match self.reconciler.reconcile_order(order).await {
                Ok(ReconcileOutcome::Transitioned(status)) => {
                    debug!(order_id = %order.order_id, new_status = %status, "poller settled order");
                    transitioned += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        order_id = %order.order_id,
                        payment_ref = %order.payment_ref,
                        error = %e,
                        "failed to reconcile order"
                    );
                }
            }
        }

        Ok(transitioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{NewOrder, OrderStatus, ShippingAddress};
    use crate::events::order_status_changed_channel;
    use crate::providers::testing::{ScriptedCardProvider, ScriptedCryptoProvider};
    use crate::store::MemoryOrderStore;
    use rust_decimal::Decimal;
    use uuid::Uuid;

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
                total: Decimal::from(25),
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

    /// An order must reach a terminal state without the buyer ever
    /// visiting the success page: the poller alone settles it.
    #[tokio::test]
    async fn poller_settles_orders_without_success_page_visits() {
        let store = Arc::new(MemoryOrderStore::new());
        let card = Arc::new(ScriptedCardProvider::healthy(2500));
        let crypto = Arc::new(ScriptedCryptoProvider::with_status("PAID"));
        let (events_tx, mut events_rx) = order_status_changed_channel();
        let reconciler = Reconciler::new(store.clone(), card.clone(), crypto, events_tx);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let poller = ReconcilePoller::new(
            store.clone(),
            reconciler,
            Arc::new(RwLock::new(PollerSettings::default())),
            shutdown_rx,
        );

        let crypto_order = insert_order(&store, PaymentMethod::Crypto, "PRE-9").await;
        let card_order = insert_order(&store, PaymentMethod::Card, "cs_9").await;
        card.set_session_status("complete");
        // Cash orders are staff-confirmed and must not be scanned.
        let cash_order = insert_order(&store, PaymentMethod::Cash, "CASH-9").await;

        let transitioned = poller.poll_once().await.unwrap();
        assert_eq!(transitioned, 2);

        let crypto_stored = store.get(crypto_order).await.unwrap().unwrap();
        assert_eq!(crypto_stored.status, OrderStatus::Completed);
        let card_stored = store.get(card_order).await.unwrap().unwrap();
        assert_eq!(card_stored.status, OrderStatus::Completed);
        let cash_stored = store.get(cash_order).await.unwrap().unwrap();
        assert_eq!(cash_stored.status, OrderStatus::Pending);

        // One event per transition, none duplicated.
        assert!(events_rx.recv().await.is_some());
        assert!(events_rx.recv().await.is_some());
        assert!(events_rx.try_recv().is_err());

        // A second scan finds nothing pending on the polled rails.
        let transitioned = poller.poll_once().await.unwrap();
        assert_eq!(transitioned, 0);
    }
}
