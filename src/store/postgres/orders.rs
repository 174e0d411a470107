//! `orders`, plus the checkout transaction that spans carts and products.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use super::cart::load_cart;
use super::catalog::{into_products, write_product, ProductRow, PRODUCT_COLUMNS};
use super::{corrupt, PgStore};
use crate::domain::aggregates::{
    Checkout, Order, OrderError, OrderItem, OrderStatus, PaymentDetails, PaymentStatus, Product, ShippingAddress,
    ShippingPolicy,
};
use crate::store::{OrderQuery, OrderStore, Page};
use crate::{EcommerceError, Result};

const ORDER_COLUMNS: &str = "id, user_id, items, shipping_address, subtotal, shipping_cost, total_amount, currency, \
     payment_method, payment_details, payment_status, order_status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total_amount: Decimal,
    currency: String,
    payment_method: String,
    payment_details: Json<PaymentDetails>,
    payment_status: String,
    order_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = EcommerceError;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            subtotal: row.subtotal,
            shipping_cost: row.shipping_cost,
            total_amount: row.total_amount,
            currency: row.currency,
            payment_method: row.payment_method.parse().map_err(|e| corrupt("orders.payment_method", e))?,
            payment_details: row.payment_details.0,
            payment_status: row.payment_status.parse().map_err(|e| corrupt("orders.payment_status", e))?,
            order_status: row.order_status.parse().map_err(|e| corrupt("orders.order_status", e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            events: Vec::new(),
        })
    }
}

fn order_listing(head: &str, query: &OrderQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(" WHERE TRUE");
    if let Some(user_id) = &query.user_id {
        qb.push(" AND user_id = ").push_bind(user_id.clone());
    }
    if let Some(status) = query.order_status {
        qb.push(" AND order_status = ").push_bind(status.as_str());
    }
    qb
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, user_id: &str, checkout: Checkout, shipping: &ShippingPolicy) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Row locks on the cart and its products, in a stable order, so two
        // checkouts of the same cart or the same scarce product serialize.
        sqlx::query("SELECT user_id FROM carts WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        let cart = load_cart(&mut tx, user_id).await?.ok_or(OrderError::EmptyCart)?;
        let ids: Vec<Uuid> = cart.items.iter().map(|l| l.product_id).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;
        let mut products: HashMap<Uuid, Product> = into_products(rows)?.into_iter().map(|p| (p.id, p)).collect();

        let order = Order::materialize(&cart, &mut products, checkout, shipping)?;

        for product in products.values() {
            write_product(&mut tx, product).await?;
        }
        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(order.id)
        .bind(&order.user_id)
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(order.subtotal)
        .bind(order.shipping_cost)
        .bind(order.total_amount)
        .bind(&order.currency)
        .bind(order.payment_method.as_str())
        .bind(Json(&order.payment_details))
        .bind(order.payment_status().as_str())
        .bind(order.order_status().as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user_id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let total: i64 = order_listing("SELECT COUNT(*) FROM orders", query)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = order_listing(&format!("SELECT {ORDER_COLUMNS} FROM orders"), query);
        qb.push(" ORDER BY created_at DESC");
        qb.push(" LIMIT ").push_bind(i64::from(query.page.limit));
        qb.push(" OFFSET ").push_bind(query.page.offset() as i64);
        let rows = qb.build_query_as::<OrderRow>().fetch_all(&self.pool).await?;
        let items = rows.into_iter().map(Order::try_from).collect::<Result<Vec<_>>>()?;

        Ok(Page { items, total: total.max(0) as u64, page: query.page.page, limit: query.page.limit })
    }

    async fn update_order_status(&self, order: &Order, previous: (OrderStatus, PaymentStatus)) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE orders SET order_status = $2, payment_status = $3, updated_at = $4 \
             WHERE id = $1 AND order_status = $5 AND payment_status = $6",
        )
        .bind(order.id)
        .bind(order.order_status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.updated_at)
        .bind(previous.0.as_str())
        .bind(previous.1.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated > 0 { return Ok(()); }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
            .bind(order.id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Err(EcommerceError::Conflict("Order was modified concurrently; reload and retry".into()))
        } else {
            Err(EcommerceError::NotFound("Order"))
        }
    }

    async fn has_purchased(&self, user_id: &str, product_id: Uuid) -> Result<bool> {
        let line = serde_json::json!([{ "productId": product_id }]);
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders \
             WHERE user_id = $1 AND order_status <> 'cancelled' AND items @> $2::jsonb)",
        )
        .bind(user_id)
        .bind(line)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }
}
