//! Order status events.
//!
//! A single bounded channel carries [`OrderStatusChanged`] events from
//! the places that transition orders (reconciliation, admin overrides)
//! to whoever wants to observe them. Events are emitted only when a
//! row actually changed, so repeated reconciliation polls never
//! duplicate notifications.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::entities::OrderStatus;

/// Default buffer size for the event channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// An order moved to a new canonical status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderStatusChanged {
    pub order_id: Uuid,
    pub new_status: OrderStatus,
}

/// Sender handle for OrderStatusChanged events.
pub type OrderStatusChangedSender = mpsc::Sender<OrderStatusChanged>;
/// Receiver handle for OrderStatusChanged events.
pub type OrderStatusChangedReceiver = mpsc::Receiver<OrderStatusChanged>;

/// Create a new OrderStatusChanged channel.
pub fn order_status_changed_channel() -> (OrderStatusChangedSender, OrderStatusChangedReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
