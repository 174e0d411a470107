//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;
use crate::domain::aggregates::order::ShippingPolicy;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::line_total;

/// Upper bound on a single line's quantity, shared by every store backend
/// (it is the largest value the Postgres `INTEGER` column holds).
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// One cart per user; at most one line per product.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

impl Cart {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { user_id: user_id.into(), items: vec![], created_at: now, updated_at: now }
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn quantity_of(&self, product_id: Uuid) -> Option<u32> {
        self.items.iter().find(|i| i.product_id == product_id).map(|i| i.quantity)
    }

    /// Adds `quantity` units; re-adding a product increments its line. Lines
    /// saturate at [`MAX_LINE_QUANTITY`].
    pub fn add_item(&mut self, product_id: Uuid, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::ZeroQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = existing.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
        } else {
            self.items.push(CartLine { product_id, quantity: quantity.min(MAX_LINE_QUANTITY) });
        }
        self.touch();
        Ok(())
    }

    /// Sets the line to exactly `quantity`; zero drops the line.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: u32) {
        let quantity = quantity.min(MAX_LINE_QUANTITY);
        if quantity == 0 {
            self.items.retain(|i| i.product_id != product_id);
        } else if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = quantity;
        } else {
            self.items.push(CartLine { product_id, quantity });
        }
        self.touch();
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    /// Read-time projection over current catalog prices. Lines whose product no
    /// longer exists are left out.
    pub fn price(&self, products: &HashMap<Uuid, Product>, shipping: &ShippingPolicy) -> CartView {
        let items: Vec<CartViewLine> = self.items.iter().filter_map(|line| {
            let product = products.get(&line.product_id)?;
            Some(CartViewLine {
                product_id: product.id,
                name: product.name.clone(),
                slug: product.slug.to_string(),
                image: product.primary_image().to_string(),
                price: product.price,
                quantity: line.quantity,
                line_total: line_total(product.price, line.quantity),
                available: product.is_purchasable() && product.stock() >= line.quantity,
            })
        }).collect();
        let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();
        let shipping_cost = if items.is_empty() { Decimal::ZERO } else { shipping.cost_for(subtotal) };
        CartView { item_count: items.iter().map(|i| i.quantity).sum(), items, subtotal, shipping_cost, total: subtotal + shipping_cost }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartViewLine>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartViewLine {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: String,
    pub price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, ZeroQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item not found"),
            Self::ZeroQuantity => write!(f, "quantity must be at least 1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;

    #[test]
    fn test_line_quantity_capped() {
        let id = Uuid::now_v7();
        let mut cart = Cart::for_user("u1");
        cart.add_item(id, u32::MAX).unwrap();
        assert_eq!(cart.quantity_of(id), Some(MAX_LINE_QUANTITY));
        cart.add_item(id, u32::MAX).unwrap();
        assert_eq!(cart.quantity_of(id), Some(MAX_LINE_QUANTITY));
        cart.set_quantity(id, u32::MAX);
        assert_eq!(cart.quantity_of(id), Some(MAX_LINE_QUANTITY));
    }

    #[test]
    fn test_add_merges_by_incrementing() {
        let p = Uuid::now_v7();
        let mut cart = Cart::for_user("user-1");
        cart.add_item(p, 2).unwrap();
        cart.add_item(p, 3).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.quantity_of(p), Some(5));
        assert_eq!(cart.add_item(p, 0), Err(CartError::ZeroQuantity));
    }

    #[test]
    fn test_set_quantity_overwrites_and_zero_removes() {
        let p = Uuid::now_v7();
        let mut cart = Cart::for_user("user-1");
        cart.add_item(p, 2).unwrap();
        cart.set_quantity(p, 3);
        assert_eq!(cart.quantity_of(p), Some(3));
        cart.set_quantity(p, 0);
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item(p), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_price_projection() {
        let shirt = sample("Shirt", Decimal::new(2000, 2), 5);
        let socks = sample("Socks", Decimal::new(450, 2), 1);
        let mut cart = Cart::for_user("user-1");
        cart.add_item(shirt.id, 2).unwrap();
        cart.add_item(socks.id, 2).unwrap();
        cart.add_item(Uuid::now_v7(), 1).unwrap();
        let products: HashMap<Uuid, Product> = [(shirt.id, shirt), (socks.id, socks)].into_iter().collect();

        let view = cart.price(&products, &ShippingPolicy::default());
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.subtotal, Decimal::new(4900, 2));
        assert_eq!(view.shipping_cost, Decimal::new(499, 2));
        assert_eq!(view.total, Decimal::new(5399, 2));
        assert!(!view.items[1].available);
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let view = Cart::for_user("u").price(&HashMap::new(), &ShippingPolicy::default());
        assert_eq!(view.total, Decimal::ZERO);
    }
}
