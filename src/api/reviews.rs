use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{ApiResult, AppState, CurrentUser, Pagination, ValidatedJson};
use crate::domain::aggregates::ReviewSort;
use crate::domain::value_objects::Rating;
use crate::store::PageRequest;
use crate::EcommerceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewParams {
    /// `recent` (default), `oldest` or `helpful`.
    pub sort_by: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 1000))]
    pub comment: String,
}

pub async fn list_reviews(
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(p): Query<ReviewParams>,
) -> ApiResult<Json<Value>> {
    let sort = p
        .sort_by
        .as_deref()
        .map(str::parse::<ReviewSort>)
        .transpose()
        .map_err(|e| EcommerceError::validation(format!("sortBy: {e}")))?
        .unwrap_or_default();
    let (page, stats) = s.reviews(product_id, sort, PageRequest::new(p.page, p.limit)).await?;
    Ok(Json(json!({ "reviews": page.items, "stats": stats, "pagination": Pagination::from(&page) })))
}

pub async fn create_review(
    user: CurrentUser,
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<ReviewRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let rating = Rating::new(r.rating).map_err(|e| EcommerceError::validation(e.to_string()))?;
    let (review, stats) = s.create_review(product_id, &user.id, user.name, rating, &r.title, &r.comment).await?;
    Ok((StatusCode::CREATED, Json(json!({ "review": review, "stats": stats }))))
}

pub async fn mark_helpful(
    user: CurrentUser,
    State(s): State<AppState>,
    Path((product_id, review_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Value>> {
    let helpful = s.mark_helpful(product_id, review_id, &user.id).await?;
    Ok(Json(json!({ "helpful": helpful })))
}
