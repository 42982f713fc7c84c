//! Postgres-backed order store.
//!
//! Schema lives in the workspace `migrations/` directory: an `orders`
//! header table and an `order_items` snapshot table, written together
//! in one transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::{OrderFilter, OrderStore, StoreError};
use crate::entities::{NewOrder, Order, OrderLineItem, OrderStatus, PaymentMethod, ShippingAddress};

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    order_id: Uuid,
    customer_name: String,
    user_id: Option<Uuid>,
    email: Option<String>,
    created_at: time::PrimitiveDateTime,
    total: Decimal,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_ref: String,
    shipping: Json<ShippingAddress>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_id: Uuid,
    product_id: String,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

const SELECT_ORDER: &str = "SELECT order_id, customer_name, user_id, email, created_at, \
     total, status, payment_method, payment_ref, shipping FROM orders";

const SELECT_ITEMS: &str = "SELECT order_id, product_id, name, unit_price, quantity \
     FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position";

impl OrderRow {
    fn into_order(self, items: Vec<OrderLineItem>) -> Order {
        Order {
            order_id: self.order_id,
            customer_name: self.customer_name,
            user_id: self.user_id,
            email: self.email,
            created_at: self.created_at,
            total: self.total,
            status: self.status,
            payment_method: self.payment_method,
            payment_ref: self.payment_ref,
            shipping: self.shipping.0,
            items,
        }
    }
}

impl From<ItemRow> for OrderLineItem {
    fn from(row: ItemRow) -> Self {
        OrderLineItem {
            product_id: row.product_id.into(),
            name: row.name,
            unit_price: row.unit_price,
            quantity: row.quantity.max(0) as u32,
        }
    }
}

impl PgOrderStore {
    /// Fetch line items for a batch of orders and attach them.
    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.order_id).collect();
        let item_rows = sqlx::query_as::<_, ItemRow>(SELECT_ITEMS)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderLineItem>> = HashMap::new();
        for item in item_rows {
            grouped
                .entry(item.order_id)
                .or_default()
                .push(item.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = grouped.remove(&row.order_id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }

    async fn fetch_one_by(&self, row: Option<OrderRow>) -> Result<Option<Order>, StoreError> {
        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }
}

fn now() -> time::PrimitiveDateTime {
    let now = time::OffsetDateTime::now_utc();
    time::PrimitiveDateTime::new(now.date(), now.time())
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[tracing::instrument(skip_all, err, name = "SQL:InsertOrder", fields(order_id = %order.order_id))]
    async fn insert(&self, order: NewOrder) -> Result<Order, StoreError> {
        let created_at = now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders \
             (order_id, customer_name, user_id, email, created_at, total, status, \
              payment_method, payment_ref, shipping) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(order.order_id)
        .bind(&order.customer_name)
        .bind(order.user_id)
        .bind(&order.email)
        .bind(created_at)
        .bind(order.total)
        .bind(OrderStatus::Pending)
        .bind(order.payment_method)
        .bind(&order.payment_ref)
        .bind(Json(&order.shipping))
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items \
                 (order_id, position, product_id, name, unit_price, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order.order_id)
            .bind(position as i32)
            .bind(item.product_id.as_str())
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(item.quantity as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            order_id: order.order_id,
            customer_name: order.customer_name,
            user_id: order.user_id,
            email: order.email,
            created_at,
            total: order.total,
            status: OrderStatus::Pending,
            payment_method: order.payment_method,
            payment_ref: order.payment_ref,
            shipping: order.shipping,
            items: order.items,
        })
    }

    #[tracing::instrument(skip_all, err, name = "SQL:GetOrder", fields(order_id = %order_id))]
    async fn get(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE order_id = $1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        self.fetch_one_by(row).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderByPaymentRef")]
    async fn get_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE payment_ref = $1"))
            .bind(payment_ref)
            .fetch_optional(&self.pool)
            .await?;
        self.fetch_one_by(row).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:ListOrdersForUser", fields(user_id = %user_id))]
    async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        self.attach_items(rows).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:ListOrders")]
    async fn list(
        &self,
        filter: OrderFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = match filter.status {
            Some(status) => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "{SELECT_ORDER} WHERE status = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "{SELECT_ORDER} ORDER BY created_at DESC LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        self.attach_items(rows).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:ListPendingOrders")]
    async fn list_pending(
        &self,
        methods: &[PaymentMethod],
        limit: i64,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE status = 'pending' AND payment_method = ANY($1) \
             ORDER BY created_at ASC LIMIT $2"
        ))
        .bind(methods)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        self.attach_items(rows).await
    }

    #[tracing::instrument(skip_all, err, name = "SQL:TransitionOrderStatus", fields(order_id = %order_id, new_status = %new_status))]
    async fn transition_from_pending(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2 WHERE order_id = $1 AND status = 'pending'",
        )
        .bind(order_id)
        .bind(new_status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip_all, err, name = "SQL:OverrideOrderStatus", fields(order_id = %order_id, new_status = %new_status))]
    async fn override_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE order_id = $1")
            .bind(order_id)
            .bind(new_status)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(order_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, err, name = "SQL:DeleteOrder", fields(order_id = %order_id))]
    async fn delete(&self, order_id: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound(order_id));
        }

        tx.commit().await?;
        Ok(())
    }
}
