//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::{OrderStatus, PaymentStatus, StockStatus};

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Review(ReviewEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    StockStatusChanged { product_id: Uuid, stock: u32, status: StockStatus },
    Archived { product_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: String, total: Decimal, currency: String },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    PaymentStatusChanged { order_id: Uuid, status: PaymentStatus },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewEvent {
    Created { review_id: Uuid, product_id: Uuid, rating: u8 },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::StockStatusChanged { .. }) => "storefront.product.stock",
            Self::Product(ProductEvent::Archived { .. }) => "storefront.product.archived",
            Self::Order(OrderEvent::Placed { .. }) => "storefront.order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "storefront.order.status",
            Self::Order(OrderEvent::PaymentStatusChanged { .. }) => "storefront.order.payment",
            Self::Review(ReviewEvent::Created { .. }) => "storefront.review.created",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_is_tagged() {
        let event = DomainEvent::Order(OrderEvent::StatusChanged {
            order_id: Uuid::nil(), from: OrderStatus::Pending, to: OrderStatus::Processing,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["to"], "processing");
        assert_eq!(event.subject(), "storefront.order.status");
    }
}
