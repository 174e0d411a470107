//! Repository traits and their backends.
//!
//! Handlers never talk to a database directly: they receive an `Arc<dyn Store>`
//! built once in `main`. Operations that must touch several records together
//! (order placement, helpful votes, category cascades, hero reordering) are
//! single trait methods so each backend can run them as one unit.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgStore, PoolConfig};

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, Category, Checkout, HeroDraft, HeroSlide, Order, OrderStatus, PaymentStatus, Product, ProductDraft, ProductStatus,
    Review, ReviewSort, ReviewStats, ShippingPolicy, StockStatus,
};
use crate::Result;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One page of results plus the total number of matches.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn pages(&self) -> u64 { self.total.div_ceil(u64::from(self.limit.max(1))) }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { items: self.items.into_iter().map(f).collect(), total: self.total, page: self.page, limit: self.limit }
    }
}

/// Page request with the bounds applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }

    /// Slices an already filtered and sorted list.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items.into_iter().skip(self.offset() as usize).take(self.limit as usize).collect();
        Page { items, total, page: self.page, limit: self.limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self { Self::new(None, None) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort { #[default] Newest, PriceAsc, PriceDesc }

/// Product listing filter. Text matching is a case-insensitive substring test
/// on name and description.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub text: Option<String>,
    pub category_id: Option<Uuid>,
    pub stock_status: Option<StockStatus>,
    pub status: Option<ProductStatus>,
    pub include_archived: bool,
    pub featured: Option<bool>,
    pub in_stock_only: bool,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
    pub page: PageRequest,
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(text) = self.text.as_deref().map(str::to_lowercase).filter(|t| !t.is_empty()) {
            if !product.name.to_lowercase().contains(&text) && !product.description.to_lowercase().contains(&text) {
                return false;
            }
        }
        if !self.include_archived && self.status != Some(ProductStatus::Archived) && product.status == ProductStatus::Archived {
            return false;
        }
        self.category_id.map_or(true, |c| product.category_id == c)
            && self.stock_status.map_or(true, |s| product.stock_status() == s)
            && self.status.map_or(true, |s| product.status == s)
            && self.featured.map_or(true, |f| product.featured == f)
            && (!self.in_stock_only || product.stock() > 0)
            && self.min_price.map_or(true, |min| product.price >= min)
            && self.max_price.map_or(true, |max| product.price <= max)
    }

    pub fn sort(&self, products: &mut [Product]) {
        match self.sort {
            ProductSort::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ProductSort::PriceAsc => products.sort_by(|a, b| a.price.cmp(&b.price).then(b.created_at.cmp(&a.created_at))),
            ProductSort::PriceDesc => products.sort_by(|a, b| b.price.cmp(&a.price).then(b.created_at.cmp(&a.created_at))),
        }
    }
}

/// Order listing filter; `user_id = None` lists every user's orders (admin).
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub user_id: Option<String>,
    pub order_status: Option<OrderStatus>,
    pub page: PageRequest,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>>;
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
    /// Fails with `Conflict` when the slug or SKU is taken.
    async fn insert_product(&self, product: &Product) -> Result<()>;
    /// Applies `draft` to the current row under a lock, so concurrent stock
    /// changes are never overwritten. Returns the stock status before the edit
    /// and the updated product. Fails with `Conflict` when the slug or SKU is
    /// taken, `NotFound` when absent.
    async fn update_product(&self, id: Uuid, draft: ProductDraft) -> Result<(StockStatus, Product)>;
    /// Sets the status to archived and touches nothing else. Returns false when
    /// the product was already archived.
    async fn archive_product(&self, id: Uuid) -> Result<bool>;
    /// Atomically subtracts `amount` and recomputes the stock status.
    async fn decrement_stock(&self, id: Uuid, amount: u32) -> Result<Product>;
    async fn set_stock(&self, id: Uuid, stock: u32) -> Result<Product>;

    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>>;
    /// Fails with `Conflict` when the name or slug is taken.
    async fn insert_category(&self, category: &Category) -> Result<()>;
    async fn update_category(&self, category: &Category) -> Result<()>;
    /// Deletes `id` and everything below it; refused while live products use any
    /// of them. Returns the deleted ids.
    async fn delete_category_tree(&self, id: Uuid) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn get_cart(&self, user_id: &str) -> Result<Option<Cart>>;
    /// Increments the line, creating cart and line as needed.
    async fn add_cart_item(&self, user_id: &str, product_id: Uuid, quantity: u32) -> Result<Cart>;
    /// Sets the line to `quantity`; zero removes it.
    async fn set_cart_item(&self, user_id: &str, product_id: Uuid, quantity: u32) -> Result<Cart>;
    async fn remove_cart_item(&self, user_id: &str, product_id: Uuid) -> Result<Cart>;
    /// Returns whether a cart existed.
    async fn clear_cart(&self, user_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Materializes the user's cart into an order as one all-or-nothing unit:
    /// stock check, stock decrement, order insert and cart delete.
    async fn place_order(&self, user_id: &str, checkout: Checkout, shipping: &ShippingPolicy) -> Result<Order>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>>;
    /// Compare-and-swap on the status pair: writes `order`'s statuses only if the
    /// stored ones still equal `previous`.
    async fn update_order_status(&self, order: &Order, previous: (OrderStatus, PaymentStatus)) -> Result<()>;
    /// Whether the user has a non-cancelled order containing the product.
    async fn has_purchased(&self, user_id: &str, product_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Fails with `DuplicateReview` when the user already reviewed the product.
    async fn insert_review(&self, review: &Review) -> Result<()>;
    async fn get_review(&self, id: Uuid) -> Result<Option<Review>>;
    async fn list_reviews(&self, product_id: Uuid, sort: ReviewSort, page: PageRequest) -> Result<Page<Review>>;
    async fn review_stats(&self, product_id: Uuid) -> Result<ReviewStats>;
    /// Records the vote and increments the counter together; returns the new count.
    async fn mark_helpful(&self, review_id: Uuid, user_id: &str) -> Result<u32>;
}

#[async_trait]
pub trait HeroStore: Send + Sync {
    async fn list_heroes(&self, active_only: bool) -> Result<Vec<HeroSlide>>;
    async fn get_hero(&self, id: Uuid) -> Result<Option<HeroSlide>>;
    /// Appends the slide after the current last position.
    async fn insert_hero(&self, draft: HeroDraft) -> Result<HeroSlide>;
    async fn update_hero(&self, hero: &HeroSlide) -> Result<()>;
    async fn delete_hero(&self, id: Uuid) -> Result<bool>;
    async fn reorder_hero(&self, id: Uuid, new_order: i32) -> Result<HeroSlide>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store: CatalogStore + CartStore + OrderStore + ReviewStore + HeroStore {}

impl<T> Store for T where T: CatalogStore + CartStore + OrderStore + ReviewStore + HeroStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_applies_defaults_and_bounds() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 10 });
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(1_000)), PageRequest { page: 3, limit: 100 });
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn page_slicing_counts_pages() {
        let page = PageRequest::new(Some(2), Some(4)).slice((0..10).collect::<Vec<_>>());
        assert_eq!(page.items, vec![4, 5, 6, 7]);
        assert_eq!(page.total, 10);
        assert_eq!(page.pages(), 3);
    }
}
