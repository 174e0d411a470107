use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{message, AdminUser, ApiResult, AppState, ValidatedJson};
use crate::domain::aggregates::HeroDraft;

fn link(target: &str) -> Result<(), ValidationError> {
    if target.starts_with('/') || validator::validate_url(target) { Ok(()) } else { Err(ValidationError::new("invalid_link")) }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HeroRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    pub subtitle: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub button_text: String,
    #[validate(custom = "link")]
    pub button_link: String,
    #[validate(custom = "link")]
    pub image: String,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool { true }

impl From<HeroRequest> for HeroDraft {
    fn from(r: HeroRequest) -> Self {
        HeroDraft {
            title: r.title,
            subtitle: r.subtitle,
            button_text: r.button_text,
            button_link: r.button_link,
            image: r.image,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    #[validate(range(min = 0))]
    pub new_order: i32,
}

pub async fn active_heroes(State(s): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "heroes": s.active_heroes().await? })))
}

pub async fn all_heroes(_admin: AdminUser, State(s): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "heroes": s.all_heroes().await? })))
}

pub async fn create_hero(
    _admin: AdminUser,
    State(s): State<AppState>,
    ValidatedJson(r): ValidatedJson<HeroRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let hero = s.create_hero(r.into()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "hero": hero }))))
}

pub async fn update_hero(
    _admin: AdminUser,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<HeroRequest>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "hero": s.update_hero(id, r.into()).await? })))
}

pub async fn delete_hero(_admin: AdminUser, State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    s.delete_hero(id).await?;
    Ok(message("Hero deleted successfully"))
}

pub async fn reorder_hero(
    _admin: AdminUser,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<ReorderRequest>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "hero": s.reorder_hero(id, r.new_order).await? })))
}
