use std::collections::HashMap;
use uuid::Uuid;

use super::Storefront;
use crate::domain::aggregates::{Cart, CartError, CartView, Product};
use crate::{EcommerceError, Result};

impl Storefront {
    /// Prices `cart` against the current catalog.
    pub(crate) async fn price_cart(&self, cart: &Cart) -> Result<CartView> {
        let ids: Vec<Uuid> = cart.items.iter().map(|l| l.product_id).collect();
        let products: HashMap<Uuid, Product> =
            self.store.products_by_ids(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
        Ok(cart.price(&products, &self.settings.shipping))
    }

    /// The user's cart; an empty one when none exists yet.
    pub async fn cart(&self, user_id: &str) -> Result<CartView> {
        let cart = self.store.get_cart(user_id).await?.unwrap_or_else(|| Cart::for_user(user_id));
        self.price_cart(&cart).await
    }

    async fn ensure_purchasable(&self, product_id: Uuid) -> Result<()> {
        let product = self.store.get_product(product_id).await?.ok_or(EcommerceError::NotFound("Product"))?;
        if !product.is_purchasable() {
            return Err(EcommerceError::validation(format!("{} is not available", product.name)));
        }
        Ok(())
    }

    /// Adds `quantity` units; re-adding a product sums the quantities.
    pub async fn add_to_cart(&self, user_id: &str, product_id: Uuid, quantity: u32) -> Result<CartView> {
        if quantity == 0 { return Err(CartError::ZeroQuantity.into()); }
        self.ensure_purchasable(product_id).await?;
        let cart = self.store.add_cart_item(user_id, product_id, quantity).await?;
        self.price_cart(&cart).await
    }

    /// Sets the line to exactly `quantity`; zero removes it.
    pub async fn set_cart_quantity(&self, user_id: &str, product_id: Uuid, quantity: u32) -> Result<CartView> {
        if quantity > 0 {
            self.ensure_purchasable(product_id).await?;
        }
        let cart = self.store.set_cart_item(user_id, product_id, quantity).await?;
        self.price_cart(&cart).await
    }

    pub async fn remove_from_cart(&self, user_id: &str, product_id: Uuid) -> Result<CartView> {
        let cart = self.store.remove_cart_item(user_id, product_id).await?;
        self.price_cart(&cart).await
    }

    pub async fn clear_cart(&self, user_id: &str) -> Result<()> {
        self.store.clear_cart(user_id).await?;
        Ok(())
    }
}
