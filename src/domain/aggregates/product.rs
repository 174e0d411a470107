//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::{Quantity, Sku, SkuError, Slug, SlugError};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub sku: Option<Sku>,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category_id: Uuid,
    pub(crate) stock: Quantity,
    pub low_stock_threshold: u32,
    pub(crate) stock_status: StockStatus,
    pub location: Option<String>,
    pub status: ProductStatus,
    pub featured: bool,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Availability derived from the stock counter and the low-stock threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus { InStock, LowStock, OutOfStock }

impl StockStatus {
    pub fn from_levels(stock: u32, low_stock_threshold: u32) -> Self {
        if stock == 0 { Self::OutOfStock }
        else if stock <= low_stock_threshold { Self::LowStock }
        else { Self::InStock }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Self::InStock => "in_stock", Self::LowStock => "low_stock", Self::OutOfStock => "out_of_stock" }
    }
}

impl FromStr for StockStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(Self::InStock),
            "low_stock" => Ok(Self::LowStock),
            "out_of_stock" => Ok(Self::OutOfStock),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Lifecycle status. `Archived` is the soft-deleted state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Active, Draft, Archived }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Draft => "draft", Self::Archived => "archived" }
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "draft" => Ok(Self::Draft),
            "archived" => Ok(Self::Archived),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Returned when a stored enum column holds a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownVariant(pub String);
impl std::error::Error for UnknownVariant {}
impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown variant '{}'", self.0) }
}

/// Admin input for creating or replacing a product. `stock: None` leaves the
/// counter untouched on update and starts a new product at zero.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub name: String,
    pub sku: Option<String>,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category_id: Uuid,
    pub stock: Option<u32>,
    pub location: Option<String>,
    pub low_stock_threshold: Option<u32>,
    pub featured: bool,
    pub status: Option<ProductStatus>,
}

impl Product {
    pub fn create(draft: ProductDraft, default_threshold: u32) -> Result<Self, ProductError> {
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::now_v7(), name: String::new(), slug: Slug::from_stored(""), sku: None,
            description: String::new(), price: Decimal::ZERO, images: vec![], category_id: draft.category_id,
            stock: Quantity::default(), low_stock_threshold: default_threshold,
            stock_status: StockStatus::OutOfStock, location: None,
            status: ProductStatus::Active, featured: false, last_restocked_at: None,
            created_at: now, updated_at: now,
        };
        product.apply(draft)?;
        Ok(product)
    }

    pub fn stock(&self) -> u32 { self.stock.value() }
    pub fn stock_status(&self) -> StockStatus { self.stock_status }
    pub fn is_purchasable(&self) -> bool { self.status == ProductStatus::Active }
    pub fn primary_image(&self) -> &str { self.images.first().map_or("", String::as_str) }

    /// Replaces the editable fields. The slug follows the name; a blank SKU or
    /// location clears it.
    pub fn apply(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        let name = draft.name.trim();
        let slug = Slug::from_name(name).map_err(ProductError::InvalidName)?;
        if draft.price.is_sign_negative() { return Err(ProductError::NegativePrice); }
        let sku = match non_blank(draft.sku) {
            Some(raw) => Some(Sku::new(&raw).map_err(ProductError::InvalidSku)?),
            None => None,
        };
        self.name = name.to_string();
        self.slug = slug;
        self.sku = sku;
        self.location = non_blank(draft.location);
        self.description = draft.description.trim().to_string();
        self.price = draft.price;
        self.images = draft.images;
        self.category_id = draft.category_id;
        self.featured = draft.featured;
        if let Some(threshold) = draft.low_stock_threshold { self.low_stock_threshold = threshold; }
        if let Some(status) = draft.status { self.status = status; }
        match draft.stock {
            Some(stock) => self.set_stock(stock),
            None => { self.refresh_stock_status(); self.touch(); }
        }
        Ok(())
    }

    /// Takes `quantity` units out of stock for an order line.
    pub fn reserve(&mut self, quantity: u32) -> Result<StockStatus, ProductError> {
        if !self.is_purchasable() { return Err(ProductError::Unavailable); }
        self.stock = self.stock.subtract(quantity).ok_or_else(|| ProductError::InsufficientStock {
            product: self.name.clone(),
            requested: quantity,
            available: self.stock.value(),
        })?;
        self.refresh_stock_status();
        self.touch();
        Ok(self.stock_status)
    }

    /// Sets the stock counter; an increase counts as a restock.
    pub fn set_stock(&mut self, stock: u32) {
        if stock > self.stock.value() { self.last_restocked_at = Some(Utc::now()); }
        self.stock = Quantity::new(stock);
        self.refresh_stock_status();
        self.touch();
    }

    pub fn archive(&mut self) { self.status = ProductStatus::Archived; self.touch(); }

    fn refresh_stock_status(&mut self) {
        self.stock_status = StockStatus::from_levels(self.stock.value(), self.low_stock_threshold);
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    InvalidName(SlugError),
    InvalidSku(SkuError),
    NegativePrice,
    Unavailable,
    InsufficientStock { product: String, requested: u32, available: u32 },
}
impl std::error::Error for ProductError {}
impl fmt::Display for ProductError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName(e) => write!(f, "invalid product name: {e}"),
            Self::InvalidSku(e) => write!(f, "invalid SKU: {e}"),
            Self::NegativePrice => write!(f, "price cannot be negative"),
            Self::Unavailable => write!(f, "product is not available for sale"),
            Self::InsufficientStock { product, requested, available } => {
                write!(f, "{product}: requested {requested}, only {available} in stock")
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn sample(name: &str, price: Decimal, stock: u32) -> Product {
    Product::create(ProductDraft {
        name: name.into(), sku: None, description: format!("{name} description"), price,
        images: vec![format!("https://cdn.example.com/{name}.jpg")], category_id: Uuid::nil(),
        stock: Some(stock), location: None, low_stock_threshold: None, featured: false, status: None,
    }, 5).unwrap()
}
