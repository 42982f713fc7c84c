//! Application state shared across all request handlers.

use std::sync::Arc;

use chandlery_core::checkout::Checkout;
use chandlery_core::events::OrderStatusChangedSender;
use chandlery_core::reconcile::Reconciler;
use chandlery_core::store::OrderStore;

use crate::config::runtime::SharedConfig;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Order persistence.
    pub store: Arc<dyn OrderStore>,
    /// Checkout service (order assembly over the configured rails).
    pub checkout: Checkout,
    /// On-demand reconciliation.
    pub reconciler: Reconciler,
    /// Runtime configuration (reloadable via SIGHUP).
    pub config: SharedConfig,
    /// Status-changed event sink, used by admin overrides.
    pub events_tx: OrderStatusChangedSender,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OrderStore>,
        checkout: Checkout,
        reconciler: Reconciler,
        config: SharedConfig,
        events_tx: OrderStatusChangedSender,
    ) -> Self {
        Self {
            store,
            checkout,
            reconciler,
            config,
            events_tx,
        }
    }
}
