use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderStatus, PaymentMethod};

/// One line of an order, captured verbatim from the cart at assembly
/// time. Intentionally decoupled from live catalog rows so historical
/// orders stay stable under catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: CompactString,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// Where the order goes once paid.
///
/// In-person rails (cash, bank transfer pickup) carry a free-form
/// pickup notice instead of a street address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShippingAddress {
    Delivery {
        recipient: String,
        line1: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line2: Option<String>,
        city: String,
        postal_code: String,
        country: String,
    },
    Pickup {
        notice: String,
    },
}

/// The durable order record.
///
/// Created exactly once by the checkout service; mutated only by
/// reconciliation (conditional status transitions) and by admin
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    pub customer_name: String,
    /// `None` for guest checkouts.
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub created_at: time::PrimitiveDateTime,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    /// Rail-specific external reference: provider session/prepay id for
    /// card and crypto, locally generated token for cash and transfer.
    pub payment_ref: String,
    pub shipping: ShippingAddress,
    pub items: Vec<OrderLineItem>,
}

/// Insert payload for the order store.
///
/// The order id is generated by the caller up front because the crypto
/// rail needs it as the prepay reference before any row exists. Status
/// and creation time are owned by the store: every new order starts
/// `pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: Uuid,
    pub customer_name: String,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_ref: String,
    pub shipping: ShippingAddress,
    pub items: Vec<OrderLineItem>,
}
