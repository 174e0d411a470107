//! Application services: the business rules that sit between the HTTP
//! handlers and the store. One `impl Storefront` block per area.

mod cart;
mod catalog;
mod checkout;
mod hero;
mod reviews;

pub use catalog::{CategoryFilter, ParentFilter};
pub use checkout::{PlaceOrder, StatusChange};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::aggregates::ShippingPolicy;
use crate::events::EventPublisher;
use crate::payment::PaymentGateway;
use crate::store::Store;

/// Tunables that shape pricing and stock levels.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub currency: String,
    pub shipping: ShippingPolicy,
    pub low_stock_threshold: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { currency: "USD".into(), shipping: ShippingPolicy::default(), low_stock_threshold: 5 }
    }
}

impl From<&AppConfig> for StoreSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            currency: config.currency.clone(),
            shipping: config.shipping.clone(),
            low_stock_threshold: config.low_stock_threshold,
        }
    }
}

/// The storefront application, shared by every request handler.
#[derive(Clone)]
pub struct Storefront {
    store: Arc<dyn Store>,
    events: EventPublisher,
    gateway: Arc<dyn PaymentGateway>,
    settings: StoreSettings,
}

impl Storefront {
    pub fn new(
        store: Arc<dyn Store>,
        events: EventPublisher,
        gateway: Arc<dyn PaymentGateway>,
        settings: StoreSettings,
    ) -> Self {
        Self { store, events, gateway, settings }
    }

    pub fn store(&self) -> &dyn Store { self.store.as_ref() }
    pub fn settings(&self) -> &StoreSettings { &self.settings }
}
