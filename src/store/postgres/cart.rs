//! `carts` and `cart_items`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use super::{to_i32, to_u32, PgStore};
use crate::domain::aggregates::{Cart, CartError, CartLine, MAX_LINE_QUANTITY};
use crate::store::CartStore;
use crate::{EcommerceError, Result};

pub(super) async fn load_cart(conn: &mut PgConnection, user_id: &str) -> Result<Option<Cart>> {
    let header: Option<(DateTime<Utc>, DateTime<Utc>)> =
        sqlx::query_as("SELECT created_at, updated_at FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
    let Some((created_at, updated_at)) = header else { return Ok(None) };

    let lines: Vec<(Uuid, i32)> =
        sqlx::query_as("SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY position")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;
    let items = lines
        .into_iter()
        .map(|(product_id, quantity)| Ok(CartLine { product_id, quantity: to_u32(quantity, "cart_items.quantity")? }))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(Cart { user_id: user_id.to_string(), items, created_at, updated_at }))
}

async fn touch_cart(conn: &mut PgConnection, user_id: &str) -> Result<()> {
    sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn reload(conn: &mut PgConnection, user_id: &str) -> Result<Cart> {
    load_cart(conn, user_id).await?.ok_or(EcommerceError::NotFound("Cart"))
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_cart(&self, user_id: &str) -> Result<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        load_cart(&mut conn, user_id).await
    }

    async fn add_cart_item(&self, user_id: &str, product_id: Uuid, quantity: u32) -> Result<Cart> {
        if quantity == 0 { return Err(CartError::ZeroQuantity.into()); }
        let mut tx = self.pool.begin().await?;
        touch_cart(&mut tx, user_id).await?;
        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, product_id) DO UPDATE \
               SET quantity = LEAST(cart_items.quantity::BIGINT + EXCLUDED.quantity, $4)::INTEGER",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(to_i32(quantity.min(MAX_LINE_QUANTITY), "quantity")?)
        .bind(i64::from(MAX_LINE_QUANTITY))
        .execute(&mut *tx)
        .await?;
        let cart = reload(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn set_cart_item(&self, user_id: &str, product_id: Uuid, quantity: u32) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        touch_cart(&mut tx, user_id).await?;
        if quantity == 0 {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query(
                "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
                 ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
            )
            .bind(user_id)
            .bind(product_id)
            .bind(to_i32(quantity.min(MAX_LINE_QUANTITY), "quantity")?)
            .execute(&mut *tx)
            .await?;
        }
        let cart = reload(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_cart_item(&self, user_id: &str, product_id: Uuid) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        if load_cart(&mut tx, user_id).await?.is_none() { return Err(EcommerceError::NotFound("Cart")); }
        let removed = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 { return Err(CartError::ItemNotFound.into()); }
        touch_cart(&mut tx, user_id).await?;
        let cart = reload(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn clear_cart(&self, user_id: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}
