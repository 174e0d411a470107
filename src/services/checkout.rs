use rust_decimal::Decimal;
use uuid::Uuid;

use super::Storefront;
use crate::domain::aggregates::{
    Checkout, Order, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::domain::value_objects::to_minor_units;
use crate::payment::PaymentIntent;
use crate::store::{OrderQuery, Page, PageRequest};
use crate::{EcommerceError, Result};

/// What the customer submits at the end of checkout.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentDetails,
    pub expected_total: Option<Decimal>,
    pub expected_shipping: Option<Decimal>,
}

/// Admin status update; at least one side must be set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusChange {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl Storefront {
    /// Opens a gateway intent for the priced cart.
    pub async fn request_intent(&self, user_id: &str) -> Result<PaymentIntent> {
        let view = self.cart(user_id).await?;
        if view.items.is_empty() { return Err(EcommerceError::validation("Cart is empty")); }
        let amount = to_minor_units(view.total).ok_or_else(|| EcommerceError::validation("Cart total is out of range"))?;
        self.gateway.create_intent(amount, &self.settings.currency, &format!("cart_{user_id}")).await
    }

    /// Verifies the payment, then turns the cart into an order in one unit.
    pub async fn place_order(&self, user_id: &str, input: PlaceOrder) -> Result<Order> {
        self.gateway.verify(input.payment_method, &input.payment_details).await?;
        let checkout = Checkout {
            shipping_address: input.shipping_address,
            payment_method: input.payment_method,
            payment_details: input.payment_details,
            currency: self.settings.currency.clone(),
            expected_total: input.expected_total,
            expected_shipping: input.expected_shipping,
        };

        let mut order = match self.store.place_order(user_id, checkout, &self.settings.shipping).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "order rejected");
                return Err(e);
            }
        };
        tracing::info!(
            order_id = %order.id,
            user_id,
            items = order.items.len(),
            total = %order.total_amount,
            "order placed"
        );
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    pub async fn orders_for(&self, user_id: &str, page: PageRequest) -> Result<Page<Order>> {
        self.store.list_orders(&OrderQuery { user_id: Some(user_id.to_string()), order_status: None, page }).await
    }

    /// Order detail for its owner; other users get `NotFound`.
    pub async fn order_for(&self, user_id: &str, id: Uuid) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(EcommerceError::NotFound("Order"))
    }

    pub async fn all_orders(&self, status: Option<OrderStatus>, page: PageRequest) -> Result<Page<Order>> {
        self.store.list_orders(&OrderQuery { user_id: None, order_status: status, page }).await
    }

    pub async fn order(&self, id: Uuid) -> Result<Order> {
        self.store.get_order(id).await?.ok_or(EcommerceError::NotFound("Order"))
    }

    /// Applies an admin status change through the transition tables.
    pub async fn change_order_status(&self, id: Uuid, change: StatusChange) -> Result<Order> {
        if change.order_status.is_none() && change.payment_status.is_none() {
            return Err(EcommerceError::validation("orderStatus or paymentStatus is required"));
        }
        let mut order = self.order(id).await?;
        let previous = (order.order_status(), order.payment_status());
        if let Some(next) = change.order_status {
            order.set_order_status(next)?;
        }
        if let Some(next) = change.payment_status {
            order.set_payment_status(next)?;
        }
        self.store.update_order_status(&order, previous).await?;
        tracing::info!(
            order_id = %id,
            order_status = %order.order_status(),
            payment_status = %order.payment_status(),
            "order status changed"
        );
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }
}
