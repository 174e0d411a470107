#![allow(dead_code)]

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use storefront::domain::aggregates::{
    Category, CategoryDraft, CategoryStatus, PaymentDetails, PaymentMethod, Product, ProductDraft, ShippingAddress,
};
use storefront::events::EventPublisher;
use storefront::payment::OfflineGateway;
use storefront::services::{PlaceOrder, StoreSettings, Storefront};
use storefront::store::{MemoryStore, Store};

pub fn storefront() -> Storefront { storefront_on(Arc::new(MemoryStore::new())) }

pub fn storefront_on(store: Arc<dyn Store>) -> Storefront {
    Storefront::new(
        store,
        EventPublisher::disabled(),
        Arc::new(OfflineGateway),
        StoreSettings::default(),
    )
}

pub fn money(text: &str) -> Decimal { text.parse().unwrap() }

pub fn category_draft(name: &str, parent_id: Option<Uuid>) -> CategoryDraft {
    CategoryDraft { name: name.into(), description: None, parent_id, status: CategoryStatus::Active, featured: false }
}

pub async fn category(s: &Storefront, name: &str) -> Category {
    s.create_category(category_draft(name, None)).await.unwrap()
}

pub fn product_draft(name: &str, price: &str, stock: u32, category_id: Uuid) -> ProductDraft {
    ProductDraft {
        name: name.into(),
        sku: None,
        description: format!("{name} description"),
        price: money(price),
        images: vec![format!("/images/{}.jpg", name.to_lowercase().replace(' ', "-"))],
        category_id,
        stock: Some(stock),
        location: None,
        low_stock_threshold: None,
        featured: false,
        status: None,
    }
}

pub async fn product(s: &Storefront, category_id: Uuid, name: &str, price: &str, stock: u32) -> Product {
    s.create_product(product_draft(name, price, stock, category_id)).await.unwrap()
}

pub fn checkout() -> PlaceOrder {
    PlaceOrder {
        shipping_address: ShippingAddress {
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+44 20 7946 0000".into(),
            street: "12 Analytical Row".into(),
            city: "London".into(),
            state: "Greater London".into(),
            zip_code: "N1 9GU".into(),
            country: "United Kingdom".into(),
        },
        payment_method: PaymentMethod::Razorpay,
        payment_details: PaymentDetails {
            payment_id: "pay_123".into(),
            order_id: "order_123".into(),
            signature: "sig_123".into(),
        },
        expected_total: None,
        expected_shipping: None,
    }
}
