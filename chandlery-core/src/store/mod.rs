//! Order persistence seam.
//!
//! The relational backend is an external collaborator, so the rest of
//! the crate only ever talks to the [`OrderStore`] trait. The Postgres
//! implementation backs the deployed service; the in-memory one backs
//! tests and embeddings.
//!
//! Two store-level rules carry the system's consistency story:
//!
//! - `insert` writes the order header and its line items as one
//!   logical transaction — no partial orders.
//! - `transition_from_pending` is a single atomic conditional update
//!   (`set status = X where status = 'pending'`), which makes repeated
//!   and concurrent reconciliation attempts safe without locking.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{NewOrder, Order, OrderStatus, PaymentMethod};

pub use memory::MemoryOrderStore;
pub use postgres::PgOrderStore;

/// Errors surfaced by the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("order already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("order not found: {0}")]
    NotFound(Uuid),
}

/// Optional filters for admin order listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

/// Durable storage for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order with status `Pending`. Header and line items
    /// are written atomically; on failure nothing is written.
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Look an order up by its rail-specific payment reference.
    async fn get_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError>;

    /// Order history for one user, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError>;

    /// Admin listing, newest first.
    async fn list(
        &self,
        filter: OrderFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError>;

    /// Pending orders on the given rails, oldest first, for the
    /// reconciliation poller.
    async fn list_pending(
        &self,
        methods: &[PaymentMethod],
        limit: i64,
    ) -> Result<Vec<Order>, StoreError>;

    /// Atomically move an order out of `Pending`. Returns `false` when
    /// the order was not pending (already terminal, or missing), in
    /// which case nothing changed.
    async fn transition_from_pending(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<bool, StoreError>;

    /// Unconditional status write for the admin back-office.
    async fn override_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<(), StoreError>;

    /// Explicit admin deletion. Orders are never deleted otherwise.
    async fn delete(&self, order_id: Uuid) -> Result<(), StoreError>;
}
