use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{message, AdminUser, ApiResult, AppState, Pagination, ValidatedJson};
use crate::domain::aggregates::{ProductDraft, ProductStatus, StockStatus};
use crate::store::{PageRequest, ProductQuery, ProductSort};
use crate::EcommerceError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub query: Option<String>,
    pub category: Option<Uuid>,
    /// Stock status: `in_stock`, `low_stock` or `out_of_stock`.
    pub status: Option<String>,
    /// Lifecycle status; admin listing only.
    pub lifecycle: Option<String>,
    pub featured: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductListParams {
    fn into_query(self) -> Result<ProductQuery, EcommerceError> {
        let sort = match self.sort.as_deref() {
            None | Some("newest") => ProductSort::Newest,
            Some("price_asc") => ProductSort::PriceAsc,
            Some("price_desc") => ProductSort::PriceDesc,
            Some(other) => return Err(EcommerceError::validation(format!("unknown sort '{other}'"))),
        };
        let stock_status = self
            .status
            .as_deref()
            .map(str::parse::<StockStatus>)
            .transpose()
            .map_err(|e| EcommerceError::validation(format!("status: {e}")))?;
        let status = self
            .lifecycle
            .as_deref()
            .map(str::parse::<ProductStatus>)
            .transpose()
            .map_err(|e| EcommerceError::validation(format!("lifecycle: {e}")))?;
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max { return Err(EcommerceError::validation("minPrice must not exceed maxPrice")); }
        }
        Ok(ProductQuery {
            text: self.query,
            category_id: self.category,
            stock_status,
            status,
            include_archived: false,
            featured: self.featured,
            in_stock_only: false,
            min_price: self.min_price,
            max_price: self.max_price,
            sort,
            page: PageRequest::new(self.page, self.limit),
        })
    }
}

fn non_negative(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() { return Err(ValidationError::new("negative_price")); }
    Ok(())
}

fn image_urls(images: &Vec<String>) -> Result<(), ValidationError> {
    if images.iter().all(|i| i.starts_with('/') || validator::validate_url(i.as_str())) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_image_url"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 50))]
    pub sku: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom = "image_urls")]
    pub images: Vec<String>,
    pub category_id: Uuid,
    /// Omitted on update to leave the counter alone.
    pub stock: Option<u32>,
    pub low_stock_threshold: Option<u32>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub status: Option<ProductStatus>,
}

impl From<ProductRequest> for ProductDraft {
    fn from(r: ProductRequest) -> Self {
        ProductDraft {
            name: r.name,
            sku: r.sku,
            description: r.description,
            price: r.price,
            images: r.images,
            category_id: r.category_id,
            stock: r.stock,
            location: r.location,
            low_stock_threshold: r.low_stock_threshold,
            featured: r.featured,
            status: r.status,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RestockRequest {
    pub stock: u32,
}

#[derive(Debug, Deserialize)]
pub struct FeaturedParams {
    pub category: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Storefront listing: active products only.
pub async fn list_products(State(s): State<AppState>, Query(p): Query<ProductListParams>) -> ApiResult<Json<Value>> {
    let mut query = ProductListParams { lifecycle: None, ..p }.into_query()?;
    query.status = Some(ProductStatus::Active);
    let page = s.list_products(&query).await?;
    Ok(Json(json!({ "products": page.items, "pagination": Pagination::from(&page) })))
}

pub async fn featured_products(State(s): State<AppState>, Query(p): Query<FeaturedParams>) -> ApiResult<Json<Value>> {
    let page = s.featured_products(p.category, PageRequest::new(p.page, p.limit)).await?;
    Ok(Json(json!({ "products": page.items, "pagination": Pagination::from(&page) })))
}

pub async fn product_by_slug(State(s): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<Value>> {
    let product = s.product_by_slug(&slug).await?;
    Ok(Json(json!({ "product": product })))
}

pub async fn admin_list_products(
    _admin: AdminUser,
    State(s): State<AppState>,
    Query(p): Query<ProductListParams>,
) -> ApiResult<Json<Value>> {
    let mut query = p.into_query()?;
    query.include_archived = true;
    let page = s.list_products(&query).await?;
    Ok(Json(json!({ "products": page.items, "pagination": Pagination::from(&page) })))
}

pub async fn admin_get_product(_admin: AdminUser, State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "product": s.product(id).await? })))
}

pub async fn create_product(
    _admin: AdminUser,
    State(s): State<AppState>,
    ValidatedJson(r): ValidatedJson<ProductRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let product = s.create_product(r.into()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

pub async fn update_product(
    _admin: AdminUser,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<ProductRequest>,
) -> ApiResult<Json<Value>> {
    let product = s.update_product(id, r.into()).await?;
    Ok(Json(json!({ "product": product })))
}

pub async fn delete_product(_admin: AdminUser, State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    s.archive_product(id).await?;
    Ok(message("Product deleted successfully"))
}

pub async fn restock(
    _admin: AdminUser,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<RestockRequest>,
) -> ApiResult<Json<Value>> {
    let product = s.restock(id, r.stock).await?;
    Ok(Json(json!({ "product": product })))
}
