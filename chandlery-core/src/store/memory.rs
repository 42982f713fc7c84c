//! In-memory order store.
//!
//! Reference implementation of [`OrderStore`] over a `BTreeMap` keyed
//! by the v7 order id, which is time-ordered, so key order doubles as
//! creation order.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{OrderFilter, OrderStore, StoreError};
use crate::entities::{NewOrder, Order, OrderStatus, PaymentMethod};

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<BTreeMap<Uuid, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders. Handy in tests asserting that a failed
    /// checkout wrote nothing.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

fn now() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_id) {
            return Err(StoreError::AlreadyExists(order.order_id));
        }
        let record = Order {
            order_id: order.order_id,
            customer_name: order.customer_name,
            user_id: order.user_id,
            email: order.email,
            created_at: now(),
            total: order.total,
            status: OrderStatus::Pending,
            payment_method: order.payment_method,
            payment_ref: order.payment_ref,
            shipping: order.shipping,
            items: order.items,
        };
        orders.insert(record.order_id, record.clone());
        Ok(record)
    }

    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn get_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.payment_ref == payment_ref)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .rev()
            .filter(|o| o.user_id == Some(user_id))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        filter: OrderFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .rev()
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_pending(
        &self,
        methods: &[PaymentMethod],
        limit: i64,
    ) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.status == OrderStatus::Pending && methods.contains(&o.payment_method))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn transition_from_pending(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order_id) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.status = new_status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn override_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_id)
            .ok_or(StoreError::NotFound(order_id))?;
        order.status = new_status;
        Ok(())
    }

    async fn delete(&self, order_id: Uuid) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        orders
            .remove(&order_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(order_id))
    }
}
