//! Payment gateway seam.
//!
//! Checkout talks to the gateway twice: once to open an intent for the cart
//! total, and once to verify what the browser sent back after paying. Only
//! the offline gateway ships here; a real gateway implements the same trait.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{PaymentDetails, PaymentMethod};
use crate::{EcommerceError, Result};

/// Gateway-side order opened for a cart total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub order_id: String,
    /// Minor currency units (cents, paise).
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_intent(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<PaymentIntent>;

    /// Confirms that `details` prove a completed payment.
    async fn verify(&self, method: PaymentMethod, details: &PaymentDetails) -> Result<()>;
}

/// Accepts any well-formed payment details. Used in development and tests.
#[derive(Debug, Clone, Default)]
pub struct OfflineGateway;

#[async_trait]
impl PaymentGateway for OfflineGateway {
    fn name(&self) -> &'static str { "offline" }

    async fn create_intent(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<PaymentIntent> {
        if amount_minor <= 0 {
            return Err(EcommerceError::Payment("amount must be positive".into()));
        }
        tracing::debug!(amount_minor, currency, receipt, "offline payment intent");
        Ok(PaymentIntent {
            order_id: format!("order_{}", Uuid::new_v4().simple()),
            amount: amount_minor,
            currency: currency.to_string(),
        })
    }

    async fn verify(&self, method: PaymentMethod, details: &PaymentDetails) -> Result<()> {
        let complete = [&details.payment_id, &details.order_id, &details.signature]
            .iter()
            .all(|field| !field.trim().is_empty());
        if !complete {
            return Err(EcommerceError::Payment(format!("incomplete {method} payment details")));
        }
        Ok(())
    }
}
