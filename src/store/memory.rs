//! In-process store. Backs the test suite and `STORE_BACKEND=memory` runs.
//!
//! Every multi-record operation holds the single write lock for its whole
//! duration, which gives it the same all-or-nothing behaviour the Postgres
//! backend gets from a transaction.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CartStore, CatalogStore, HeroStore, OrderQuery, OrderStore, Page, PageRequest, ProductQuery, ReviewStore};
use crate::domain::aggregates::{
    category, hero, review, Cart, Category, Checkout, HeroDraft, HeroSlide, Order, OrderError, OrderStatus,
    PaymentStatus, Product, ProductDraft, ProductStatus, Review, ReviewSort, ReviewStats, ShippingPolicy,
    StockStatus,
};
use crate::{EcommerceError, Result};

#[derive(Debug, Default)]
struct State {
    products: HashMap<Uuid, Product>,
    categories: HashMap<Uuid, Category>,
    carts: HashMap<String, Cart>,
    orders: HashMap<Uuid, Order>,
    reviews: HashMap<Uuid, Review>,
    helpful_votes: HashSet<(Uuid, String)>,
    heroes: HashMap<Uuid, HeroSlide>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl State {
    /// Slug and SKU uniqueness against every other product. SKUs are stored
    /// uppercased, so equality is already case-insensitive.
    fn product_clash(&self, product: &Product) -> Option<EcommerceError> {
        let others = || self.products.values().filter(|p| p.id != product.id);
        if others().any(|p| p.slug == product.slug) {
            return Some(EcommerceError::Conflict("A product with this name already exists".into()));
        }
        if product.sku.is_some() && others().any(|p| p.sku == product.sku) {
            return Some(EcommerceError::Conflict("A product with this SKU already exists".into()));
        }
        None
    }

    fn category_clash(&self, category: &Category) -> bool {
        self.categories.values().any(|c| {
            c.id != category.id && (c.name.to_lowercase() == category.name.to_lowercase() || c.slug == category.slug)
        })
    }

    fn cart_mut(&mut self, user_id: &str) -> &mut Cart {
        self.carts.entry(user_id.to_string()).or_insert_with(|| Cart::for_user(user_id))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let state = self.state.read().await;
        let mut matches: Vec<Product> = state.products.values().filter(|p| query.matches(p)).cloned().collect();
        query.sort(&mut matches);
        Ok(query.page.slice(matches))
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.values().find(|p| p.slug.as_str() == slug).cloned())
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(e) = state.product_clash(product) { return Err(e); }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, id: Uuid, draft: ProductDraft) -> Result<(StockStatus, Product)> {
        let mut state = self.state.write().await;
        let mut product = state.products.get(&id).cloned().ok_or(EcommerceError::NotFound("Product"))?;
        let before = product.stock_status();
        product.apply(draft)?;
        if let Some(e) = state.product_clash(&product) { return Err(e); }
        state.products.insert(id, product.clone());
        Ok((before, product))
    }

    async fn archive_product(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let product = state.products.get_mut(&id).ok_or(EcommerceError::NotFound("Product"))?;
        if product.status == ProductStatus::Archived { return Ok(false); }
        product.archive();
        Ok(true)
    }

    async fn decrement_stock(&self, id: Uuid, amount: u32) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state.products.get_mut(&id).ok_or(EcommerceError::NotFound("Product"))?;
        let mut updated = product.clone();
        updated.reserve(amount)?;
        *product = updated.clone();
        Ok(updated)
    }

    async fn set_stock(&self, id: Uuid, stock: u32) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state.products.get_mut(&id).ok_or(EcommerceError::NotFound("Product"))?;
        product.set_stock(stock);
        Ok(product.clone())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.state.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        let mut state = self.state.write().await;
        if state.category_clash(category) {
            return Err(EcommerceError::Conflict("A category with this name already exists".into()));
        }
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&category.id) { return Err(EcommerceError::NotFound("Category")); }
        if state.category_clash(category) {
            return Err(EcommerceError::Conflict("A category with this name already exists".into()));
        }
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category_tree(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&id) { return Err(EcommerceError::NotFound("Category")); }
        let all: Vec<Category> = state.categories.values().cloned().collect();
        let ids = category::subtree_ids(&all, id);
        let in_use = state.products.values().any(|p| p.status != ProductStatus::Archived && ids.contains(&p.category_id));
        if in_use {
            return Err(EcommerceError::Conflict("Cannot delete a category that still has products".into()));
        }
        for id in &ids { state.categories.remove(id); }
        Ok(ids)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_cart(&self, user_id: &str) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(user_id).cloned())
    }

    async fn add_cart_item(&self, user_id: &str, product_id: Uuid, quantity: u32) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = state.cart_mut(user_id);
        cart.add_item(product_id, quantity)?;
        Ok(cart.clone())
    }

    async fn set_cart_item(&self, user_id: &str, product_id: Uuid, quantity: u32) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = state.cart_mut(user_id);
        cart.set_quantity(product_id, quantity);
        Ok(cart.clone())
    }

    async fn remove_cart_item(&self, user_id: &str, product_id: Uuid) -> Result<Cart> {
        let mut state = self.state.write().await;
        let cart = state.carts.get_mut(user_id).ok_or(EcommerceError::NotFound("Cart"))?;
        cart.remove_item(product_id)?;
        Ok(cart.clone())
    }

    async fn clear_cart(&self, user_id: &str) -> Result<bool> {
        Ok(self.state.write().await.carts.remove(user_id).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, user_id: &str, checkout: Checkout, shipping: &ShippingPolicy) -> Result<Order> {
        let mut state = self.state.write().await;
        let cart = state.carts.get(user_id).cloned().ok_or(OrderError::EmptyCart)?;
        let mut products: HashMap<Uuid, Product> = cart
            .items
            .iter()
            .filter_map(|line| state.products.get(&line.product_id).map(|p| (p.id, p.clone())))
            .collect();

        let order = Order::materialize(&cart, &mut products, checkout, shipping)?;

        state.products.extend(products);
        state.carts.remove(user_id);
        let mut stored = order.clone();
        stored.events.clear();
        state.orders.insert(order.id, stored);
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| query.user_id.as_deref().map_or(true, |u| o.user_id == u))
            .filter(|o| query.order_status.map_or(true, |s| o.order_status() == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(query.page.slice(orders))
    }

    async fn update_order_status(&self, order: &Order, previous: (OrderStatus, PaymentStatus)) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state.orders.get_mut(&order.id).ok_or(EcommerceError::NotFound("Order"))?;
        if (stored.order_status, stored.payment_status) != previous {
            return Err(EcommerceError::Conflict("Order was modified concurrently; reload and retry".into()));
        }
        stored.order_status = order.order_status;
        stored.payment_status = order.payment_status;
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn has_purchased(&self, user_id: &str, product_id: Uuid) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.orders.values().any(|o| {
            o.user_id == user_id
                && o.order_status != OrderStatus::Cancelled
                && o.items.iter().any(|i| i.product_id == product_id)
        }))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, review: &Review) -> Result<()> {
        let mut state = self.state.write().await;
        let duplicate = state.reviews.values().any(|r| r.product_id == review.product_id && r.user_id == review.user_id);
        if duplicate { return Err(EcommerceError::DuplicateReview); }
        state.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>> {
        Ok(self.state.read().await.reviews.get(&id).cloned())
    }

    async fn list_reviews(&self, product_id: Uuid, sort: ReviewSort, page: PageRequest) -> Result<Page<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state.reviews.values().filter(|r| r.product_id == product_id).cloned().collect();
        review::sort_reviews(&mut reviews, sort);
        Ok(page.slice(reviews))
    }

    async fn review_stats(&self, product_id: Uuid) -> Result<ReviewStats> {
        let state = self.state.read().await;
        Ok(ReviewStats::from_ratings(state.reviews.values().filter(|r| r.product_id == product_id).map(|r| r.rating)))
    }

    async fn mark_helpful(&self, review_id: Uuid, user_id: &str) -> Result<u32> {
        let mut state = self.state.write().await;
        if !state.reviews.contains_key(&review_id) { return Err(EcommerceError::NotFound("Review")); }
        if !state.helpful_votes.insert((review_id, user_id.to_string())) { return Err(EcommerceError::AlreadyVoted); }
        let review = state.reviews.get_mut(&review_id).ok_or(EcommerceError::NotFound("Review"))?;
        review.helpful += 1;
        review.updated_at = Utc::now();
        Ok(review.helpful)
    }
}

#[async_trait]
impl HeroStore for MemoryStore {
    async fn list_heroes(&self, active_only: bool) -> Result<Vec<HeroSlide>> {
        let state = self.state.read().await;
        let mut slides: Vec<HeroSlide> = state.heroes.values().filter(|h| !active_only || h.is_active).cloned().collect();
        hero::sort_for_display(&mut slides);
        Ok(slides)
    }

    async fn get_hero(&self, id: Uuid) -> Result<Option<HeroSlide>> {
        Ok(self.state.read().await.heroes.get(&id).cloned())
    }

    async fn insert_hero(&self, draft: HeroDraft) -> Result<HeroSlide> {
        let mut state = self.state.write().await;
        let existing: Vec<HeroSlide> = state.heroes.values().cloned().collect();
        let slide = HeroSlide::create(draft, &existing);
        state.heroes.insert(slide.id, slide.clone());
        Ok(slide)
    }

    async fn update_hero(&self, hero: &HeroSlide) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state.heroes.get_mut(&hero.id).ok_or(EcommerceError::NotFound("Hero"))?;
        *stored = hero.clone();
        Ok(())
    }

    async fn delete_hero(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.heroes.remove(&id).is_some())
    }

    async fn reorder_hero(&self, id: Uuid, new_order: i32) -> Result<HeroSlide> {
        let mut state = self.state.write().await;
        let mut slides: Vec<HeroSlide> = state.heroes.values().cloned().collect();
        hero::reorder(&mut slides, id, new_order)?;
        let moved = slides.iter().find(|h| h.id == id).cloned().ok_or(EcommerceError::NotFound("Hero"))?;
        state.heroes = slides.into_iter().map(|h| (h.id, h)).collect();
        Ok(moved)
    }
}
