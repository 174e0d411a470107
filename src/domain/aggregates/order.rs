//! Order Aggregate
//!
//! An order is a frozen snapshot of a cart taken at checkout. After creation
//! only the two status fields change, each through its own transition table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::cart::Cart;
use crate::domain::aggregates::product::{Product, UnknownVariant};
use crate::domain::events::{DomainEvent, OrderEvent, ProductEvent};
use crate::domain::value_objects::line_total;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentDetails,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

/// Line snapshot, independent of later catalog edits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: String,
    pub price: Decimal,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// What the gateway handed back to the browser after a successful payment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub payment_id: String,
    pub order_id: String,
    pub signature: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { #[default] Razorpay, Stripe, Paypal }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Cancelled) | (Processing, Shipped) | (Processing, Cancelled) | (Shipped, Delivered)
        )
    }
}

impl PaymentStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        use PaymentStatus::*;
        matches!((self, next), (Pending, Paid) | (Pending, Failed) | (Failed, Pending) | (Failed, Paid))
    }
}

macro_rules! text_enum {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $text),+ }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

text_enum!(PaymentMethod { Razorpay => "razorpay", Stripe => "stripe", Paypal => "paypal" });
text_enum!(PaymentStatus { Pending => "pending", Paid => "paid", Failed => "failed" });
text_enum!(OrderStatus {
    Pending => "pending", Processing => "processing", Shipped => "shipped",
    Delivered => "delivered", Cancelled => "cancelled",
});

/// Flat-rate shipping, waived above a subtotal threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShippingPolicy { pub free_over: Decimal, pub flat_rate: Decimal }

impl Default for ShippingPolicy {
    fn default() -> Self { Self { free_over: Decimal::ONE_HUNDRED, flat_rate: Decimal::new(499, 2) } }
}

impl ShippingPolicy {
    pub fn cost_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_over { Decimal::ZERO } else { self.flat_rate }
    }
}

/// Checkout input that is not derived from the cart.
#[derive(Clone, Debug)]
pub struct Checkout {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentDetails,
    pub currency: String,
    /// Totals the client displayed; a mismatch means the cart or prices moved.
    pub expected_total: Option<Decimal>,
    pub expected_shipping: Option<Decimal>,
}

impl Order {
    /// Turns a cart into an order, reserving stock on the given products.
    ///
    /// Every line is checked before any product is touched, so on `Err` the
    /// products in `products` are unchanged.
    pub fn materialize(
        cart: &Cart,
        products: &mut HashMap<Uuid, Product>,
        checkout: Checkout,
        shipping: &ShippingPolicy,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::EmptyCart); }

        let mut items = Vec::with_capacity(cart.items.len());
        for line in &cart.items {
            let product = products.get(&line.product_id).ok_or(OrderError::ProductMissing(line.product_id))?;
            if !product.is_purchasable() { return Err(OrderError::Unavailable { product: product.name.clone() }); }
            if product.stock() < line.quantity {
                return Err(OrderError::InsufficientStock {
                    product: product.name.clone(), requested: line.quantity, available: product.stock(),
                });
            }
            items.push(OrderItem {
                product_id: product.id, name: product.name.clone(), slug: product.slug.to_string(),
                image: product.primary_image().to_string(), price: product.price, quantity: line.quantity,
            });
        }

        let subtotal: Decimal = items.iter().map(|i| line_total(i.price, i.quantity)).sum();
        let shipping_cost = shipping.cost_for(subtotal);
        let total_amount = subtotal + shipping_cost;
        if let Some(expected) = checkout.expected_shipping.filter(|e| *e != shipping_cost) {
            return Err(OrderError::TotalMismatch { expected, actual: shipping_cost });
        }
        if let Some(expected) = checkout.expected_total.filter(|e| *e != total_amount) {
            return Err(OrderError::TotalMismatch { expected, actual: total_amount });
        }

        let id = Uuid::now_v7();
        let mut events = Vec::new();
        for item in &items {
            if let Some(product) = products.get_mut(&item.product_id) {
                let before = product.stock_status();
                let after = product.reserve(item.quantity).map_err(|_| OrderError::InsufficientStock {
                    product: item.name.clone(), requested: item.quantity, available: product.stock(),
                })?;
                if after != before {
                    events.push(DomainEvent::Product(ProductEvent::StockStatusChanged {
                        product_id: product.id, stock: product.stock(), status: after,
                    }));
                }
            }
        }
        events.push(DomainEvent::Order(OrderEvent::Placed {
            order_id: id, user_id: cart.user_id.clone(), total: total_amount, currency: checkout.currency.clone(),
        }));

        let now = Utc::now();
        Ok(Self {
            id, user_id: cart.user_id.clone(), items, shipping_address: checkout.shipping_address,
            subtotal, shipping_cost, total_amount, currency: checkout.currency,
            payment_method: checkout.payment_method, payment_details: checkout.payment_details,
            payment_status: PaymentStatus::Paid, order_status: OrderStatus::Pending,
            created_at: now, updated_at: now, events,
        })
    }

    pub fn order_status(&self) -> OrderStatus { self.order_status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }

    pub fn set_order_status(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.order_status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { kind: "order", from: self.order_status.as_str(), to: next.as_str() });
        }
        let from = self.order_status;
        self.order_status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(())
    }

    pub fn set_payment_status(&mut self, next: PaymentStatus) -> Result<(), OrderError> {
        if !self.payment_status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { kind: "payment", from: self.payment_status.as_str(), to: next.as_str() });
        }
        self.payment_status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentStatusChanged { order_id: self.id, status: next }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderError {
    EmptyCart,
    ProductMissing(Uuid),
    Unavailable { product: String },
    InsufficientStock { product: String, requested: u32, available: u32 },
    TotalMismatch { expected: Decimal, actual: Decimal },
    InvalidTransition { kind: &'static str, from: &'static str, to: &'static str },
}
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCart => write!(f, "Cart is empty"),
            Self::ProductMissing(id) => write!(f, "Product not found: {id}"),
            Self::Unavailable { product } => write!(f, "Product is no longer available: {product}"),
            Self::InsufficientStock { product, requested, available } => {
                write!(f, "Insufficient stock for product: {product} (requested {requested}, available {available})")
            }
            Self::TotalMismatch { expected, actual } => write!(f, "Order total changed: expected {expected}, now {actual}"),
            Self::InvalidTransition { kind, from, to } => write!(f, "Cannot change {kind} status from {from} to {to}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;

    fn checkout() -> Checkout {
        Checkout {
            shipping_address: ShippingAddress { full_name: "Ada".into(), street: "1 Main St".into(), ..Default::default() },
            payment_method: PaymentMethod::Razorpay,
            payment_details: PaymentDetails { payment_id: "pay_1".into(), order_id: "order_1".into(), signature: "sig".into() },
            currency: "USD".into(),
            expected_total: None,
            expected_shipping: None,
        }
    }

    #[test]
    fn test_materialize_snapshots_and_reserves() {
        let product = sample("sku-1", Decimal::new(2000, 2), 5);
        let id = product.id;
        let mut products: HashMap<Uuid, Product> = [(id, product)].into_iter().collect();
        let mut cart = Cart::for_user("user-1");
        cart.add_item(id, 2).unwrap();

        let mut order = Order::materialize(&cart, &mut products, checkout(), &ShippingPolicy::default()).unwrap();
        assert_eq!(order.subtotal, Decimal::new(4000, 2));
        assert_eq!(order.total_amount, Decimal::new(4000, 2) + Decimal::new(499, 2));
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.order_status(), OrderStatus::Pending);
        assert_eq!(order.items[0].slug, "sku-1");
        assert_eq!(products[&id].stock(), 3);
        assert!(order.take_events().iter().any(|e| matches!(e, DomainEvent::Order(OrderEvent::Placed { .. }))));
    }

    #[test]
    fn test_materialize_is_all_or_nothing() {
        let plenty = sample("Plenty", Decimal::ONE, 10);
        let scarce = sample("Scarce", Decimal::ONE, 1);
        let (a, b) = (plenty.id, scarce.id);
        let mut products: HashMap<Uuid, Product> = [(a, plenty), (b, scarce)].into_iter().collect();
        let mut cart = Cart::for_user("user-1");
        cart.add_item(a, 4).unwrap();
        cart.add_item(b, 2).unwrap();

        let err = Order::materialize(&cart, &mut products, checkout(), &ShippingPolicy::default()).unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { requested: 2, available: 1, .. }));
        assert_eq!(products[&a].stock(), 10);
        assert_eq!(products[&b].stock(), 1);
    }

    #[test]
    fn test_total_mismatch_rejected() {
        let product = sample("Book", Decimal::new(15000, 2), 3);
        let id = product.id;
        let mut products: HashMap<Uuid, Product> = [(id, product)].into_iter().collect();
        let mut cart = Cart::for_user("user-1");
        cart.add_item(id, 1).unwrap();
        let mut input = checkout();
        input.expected_total = Some(Decimal::new(15499, 2));

        let err = Order::materialize(&cart, &mut products, input, &ShippingPolicy::default()).unwrap_err();
        assert_eq!(err, OrderError::TotalMismatch { expected: Decimal::new(15499, 2), actual: Decimal::new(15000, 2) });
        assert_eq!(products[&id].stock(), 3);
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = Order::materialize(&Cart::for_user("u"), &mut HashMap::new(), checkout(), &ShippingPolicy::default());
        assert_eq!(err.unwrap_err(), OrderError::EmptyCart);
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_payment_status_transitions() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(PaymentStatus::Failed.can_transition_to(PaymentStatus::Paid));
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn test_illegal_transition_leaves_status() {
        let product = sample("Cup", Decimal::ONE, 2);
        let id = product.id;
        let mut products: HashMap<Uuid, Product> = [(id, product)].into_iter().collect();
        let mut cart = Cart::for_user("user-1");
        cart.add_item(id, 1).unwrap();
        let mut order = Order::materialize(&cart, &mut products, checkout(), &ShippingPolicy::default()).unwrap();

        assert!(order.set_order_status(OrderStatus::Delivered).is_err());
        assert_eq!(order.order_status(), OrderStatus::Pending);
        order.set_order_status(OrderStatus::Processing).unwrap();
        order.set_order_status(OrderStatus::Shipped).unwrap();
        assert_eq!(order.order_status(), OrderStatus::Shipped);
    }

    #[test]
    fn test_status_text_round_trip() {
        assert_eq!("cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("refunded".parse::<OrderStatus>().is_err());
    }
}
