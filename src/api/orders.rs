use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{AdminUser, ApiResult, AppState, CurrentUser, Pagination, ValidatedJson};
use crate::domain::aggregates::{OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, ShippingAddress};
use crate::services::{PlaceOrder, StatusChange};
use crate::store::PageRequest;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 32))]
    pub phone: String,
    #[validate(length(min = 1))]
    pub street: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub zip_code: String,
    #[validate(length(min = 1))]
    pub country: String,
}

impl From<ShippingDetails> for ShippingAddress {
    fn from(d: ShippingDetails) -> Self {
        ShippingAddress {
            full_name: d.full_name,
            email: d.email,
            phone: d.phone,
            street: d.street,
            city: d.city,
            state: d.state,
            zip_code: d.zip_code,
            country: d.country,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate]
    pub shipping_details: ShippingDetails,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentDetails,
    /// Totals the checkout page showed; rejected when they no longer match.
    pub total_amount: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrderParams {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

pub async fn request_intent(user: CurrentUser, State(s): State<AppState>) -> ApiResult<Json<Value>> {
    let intent = s.request_intent(&user.id).await?;
    Ok(Json(json!(intent)))
}

/// Places an order from the caller's server-side cart. Line items always come
/// from the stored cart with current catalog prices; any `items` array in the
/// request body is ignored, and the optional totals only act as a staleness check.
pub async fn place_order(
    user: CurrentUser,
    State(s): State<AppState>,
    ValidatedJson(r): ValidatedJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let input = PlaceOrder {
        shipping_address: r.shipping_details.into(),
        payment_method: r.payment_method,
        payment_details: r.payment_details,
        expected_total: r.total_amount,
        expected_shipping: r.shipping_cost,
    };
    let order = s.place_order(&user.id, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": order.id, "message": "Order placed successfully" }))))
}

pub async fn list_orders(user: CurrentUser, State(s): State<AppState>, Query(p): Query<PageParams>) -> ApiResult<Json<Value>> {
    let page = s.orders_for(&user.id, PageRequest::new(p.page, p.limit)).await?;
    Ok(Json(json!({ "orders": page.items, "pagination": Pagination::from(&page) })))
}

pub async fn get_order(user: CurrentUser, State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "order": s.order_for(&user.id, id).await? })))
}

pub async fn admin_list_orders(
    _admin: AdminUser,
    State(s): State<AppState>,
    Query(p): Query<AdminOrderParams>,
) -> ApiResult<Json<Value>> {
    let page = s.all_orders(p.status, PageRequest::new(p.page, p.limit)).await?;
    Ok(Json(json!({ "orders": page.items, "pagination": Pagination::from(&page) })))
}

pub async fn change_status(
    _admin: AdminUser,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<ChangeStatusRequest>,
) -> ApiResult<Json<Value>> {
    let change = StatusChange { order_status: r.order_status, payment_status: r.payment_status };
    Ok(Json(json!({ "order": s.change_order_status(id, change).await? })))
}
