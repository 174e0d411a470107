use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{message, ApiResult, AppState, CurrentUser, ValidatedJson};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetQuantityRequest {
    #[validate(range(max = 999))]
    pub quantity: u32,
}

pub async fn get_cart(user: CurrentUser, State(s): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "cart": s.cart(&user.id).await? })))
}

pub async fn add_to_cart(
    user: CurrentUser,
    State(s): State<AppState>,
    ValidatedJson(r): ValidatedJson<AddItemRequest>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "cart": s.add_to_cart(&user.id, r.product_id, r.quantity).await? })))
}

pub async fn set_quantity(
    user: CurrentUser,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<SetQuantityRequest>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "cart": s.set_cart_quantity(&user.id, product_id, r.quantity).await? })))
}

pub async fn remove_item(user: CurrentUser, State(s): State<AppState>, Path(product_id): Path<Uuid>) -> ApiResult<Json<Value>> {
    s.remove_from_cart(&user.id, product_id).await?;
    Ok(message("Item removed from cart"))
}

pub async fn clear_cart(user: CurrentUser, State(s): State<AppState>) -> ApiResult<Json<Value>> {
    s.clear_cart(&user.id).await?;
    Ok(message("Cart cleared successfully"))
}
