//! HTTP surface: routing, error mapping and the JSON request/response types.

mod auth;
mod cart;
mod categories;
mod extract;
mod hero;
mod orders;
mod products;
mod reviews;

pub use auth::{AdminUser, CurrentUser};
pub use extract::ValidatedJson;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::Storefront;
use crate::store::Page;
use crate::EcommerceError;

pub type AppState = Storefront;

/// Error body: `{ "error": ..., "details": ... }`.
#[derive(Debug)]
pub struct ApiError(pub EcommerceError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<EcommerceError> for ApiError {
    fn from(e: EcommerceError) -> Self { Self(e) }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EcommerceError::Validation { .. }
            | EcommerceError::Conflict(_)
            | EcommerceError::DuplicateReview
            | EcommerceError::AlreadyVoted
            | EcommerceError::InsufficientStock { .. }
            | EcommerceError::InvalidTransition { .. }
            | EcommerceError::Payment(_) => StatusCode::BAD_REQUEST,
            EcommerceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            EcommerceError::Forbidden => StatusCode::FORBIDDEN,
            EcommerceError::NotFound(_) => StatusCode::NOT_FOUND,
            EcommerceError::StorageError(_) | EcommerceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            serde_json::json!({ "error": "Internal server error" })
        } else {
            match &self.0 {
                EcommerceError::Validation { message, details: Some(details) } => {
                    serde_json::json!({ "error": message, "details": details })
                }
                e => serde_json::json!({ "error": e.to_string() }),
            }
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self { total: page.total, page: page.page, limit: page.limit, pages: page.pages() }
    }
}

/// `{ "message": ... }` acknowledgement.
pub(crate) fn message(text: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": text }))
}

pub fn build_router(state: AppState) -> Router {
    let storefront = Router::new()
        .route("/api/products", get(products::list_products))
        .route("/api/products/featured", get(products::featured_products))
        .route("/api/products/info/:slug", get(products::product_by_slug))
        .route("/api/products/:id/reviews", get(reviews::list_reviews).post(reviews::create_review))
        .route("/api/products/:id/reviews/:review_id/helpful", post(reviews::mark_helpful))
        .route("/api/categories", get(categories::list_categories))
        .route("/api/cart", get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart))
        .route("/api/cart/items/:product_id", put(cart::set_quantity).delete(cart::remove_item))
        .route("/api/payment/intent", post(orders::request_intent))
        .route("/api/orders", get(orders::list_orders).post(orders::place_order))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/hero", get(hero::active_heroes));

    let admin = Router::new()
        .route("/api/admin/products", get(products::admin_list_products).post(products::create_product))
        .route(
            "/api/admin/products/:id",
            get(products::admin_get_product).put(products::update_product).delete(products::delete_product),
        )
        .route("/api/admin/products/:id/stock", put(products::restock))
        .route("/api/admin/categories", get(categories::admin_list_categories).post(categories::create_category))
        .route(
            "/api/admin/categories/:id",
            get(categories::get_category).put(categories::update_category).delete(categories::delete_category),
        )
        .route("/api/admin/orders", get(orders::admin_list_orders))
        .route("/api/admin/orders/:id/status", put(orders::change_status))
        .route("/api/admin/hero", get(hero::all_heroes).post(hero::create_hero))
        .route(
            "/api/admin/hero/:id",
            put(hero::update_hero).delete(hero::delete_hero).patch(hero::reorder_hero),
        );

    Router::new()
        .route("/health", get(health))
        .merge(storefront)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "opensase-storefront" }))
}
