pub mod order;

use serde::{Deserialize, Serialize};

pub use order::{NewOrder, Order, OrderLineItem, ShippingAddress};

/// Canonical order status vocabulary.
///
/// Every payment provider speaks its own status language; the rail
/// adapters translate into this one. `Pending` is the only non-terminal
/// state and the mandatory initial state of every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase", type_name = "order_status")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl OrderStatus {
    /// Returns `true` if no further automated transition is defined
    /// out of this status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Supported payment rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case", type_name = "payment_method")]
pub enum PaymentMethod {
    Card,
    Cash,
    BankTransfer,
    Crypto,
}

impl PaymentMethod {
    /// Rails whose confirmation arrives from the provider rather than
    /// from staff, and which the reconciliation poller therefore scans.
    pub fn is_provider_confirmed(self) -> bool {
        matches!(self, PaymentMethod::Card | PaymentMethod::Crypto)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::BankTransfer => write!(f, "bank-transfer"),
            PaymentMethod::Crypto => write!(f, "crypto"),
        }
    }
}
