//! OpenSASE Storefront
//!
//! Self-hosted storefront back end: catalog, cart, checkout, orders, reviews.
//!
//! ## Features
//! - Product catalog and category tree management
//! - Per-user shopping cart
//! - Checkout with all-or-nothing stock reservation
//! - Order tracking with enforced status transitions
//! - Product reviews with helpful votes
//! - Homepage hero slides

pub mod api;
pub mod config;
pub mod domain;
pub mod events;
pub mod payment;
pub mod services;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::{CartError, CategoryError, HeroError, OrderError, ProductError, ReviewError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{message}")]
    Validation { message: String, details: Option<serde_json::Value> },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("You have already reviewed this product")]
    DuplicateReview,

    #[error("You have already marked this review as helpful")]
    AlreadyVoted,

    #[error("Insufficient stock for product: {product}")]
    InsufficientStock { product: String, requested: u32, available: u32 },

    #[error("Cannot change {kind} status from {from} to {to}")]
    InvalidTransition { kind: &'static str, from: &'static str, to: &'static str },

    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Admin access required")]
    Forbidden,

    #[error("Payment error: {0}")]
    Payment(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl EcommerceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), details: None }
    }
}

impl From<OrderError> for EcommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InsufficientStock { product, requested, available } => {
                Self::InsufficientStock { product, requested, available }
            }
            OrderError::InvalidTransition { kind, from, to } => Self::InvalidTransition { kind, from, to },
            OrderError::ProductMissing(_) | OrderError::Unavailable { .. } => Self::Conflict(e.to_string()),
            OrderError::EmptyCart | OrderError::TotalMismatch { .. } => Self::validation(e.to_string()),
        }
    }
}

impl From<ProductError> for EcommerceError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::InsufficientStock { product, requested, available } => {
                Self::InsufficientStock { product, requested, available }
            }
            ProductError::Unavailable => Self::Conflict(e.to_string()),
            ProductError::InvalidName(_) | ProductError::InvalidSku(_) | ProductError::NegativePrice => {
                Self::validation(e.to_string())
            }
        }
    }
}

impl From<CategoryError> for EcommerceError {
    fn from(e: CategoryError) -> Self {
        match e {
            CategoryError::InvalidName(_) | CategoryError::ParentNotFound(_) => Self::validation(e.to_string()),
            CategoryError::SelfParent | CategoryError::DescendantParent => Self::Conflict(e.to_string()),
        }
    }
}

impl From<CartError> for EcommerceError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Self::NotFound("Cart item"),
            CartError::ZeroQuantity => Self::validation(e.to_string()),
        }
    }
}

impl From<ReviewError> for EcommerceError {
    fn from(e: ReviewError) -> Self { Self::validation(e.to_string()) }
}

impl From<HeroError> for EcommerceError {
    fn from(e: HeroError) -> Self {
        match e {
            HeroError::NotFound => Self::NotFound("Hero"),
            HeroError::NegativeOrder => Self::validation(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
