use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{message, AdminUser, ApiResult, AppState, ValidatedJson};
use crate::domain::aggregates::{CategoryDraft, CategoryStatus};
use crate::services::{CategoryFilter, ParentFilter};
use crate::EcommerceError;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryParams {
    /// `root` for top-level categories, or a parent id.
    pub parent: Option<String>,
    pub status: Option<CategoryStatus>,
    pub query: Option<String>,
}

impl CategoryParams {
    fn into_filter(self) -> Result<CategoryFilter, EcommerceError> {
        let parent = match self.parent.as_deref().map(str::trim) {
            None | Some("") => ParentFilter::Any,
            Some("root") | Some("null") => ParentFilter::Root,
            Some(id) => ParentFilter::Of(id.parse().map_err(|_| EcommerceError::validation("parent must be 'root' or a category id"))?),
        };
        Ok(CategoryFilter { parent, status: self.status, query: self.query })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub status: CategoryStatus,
    #[serde(default)]
    pub featured: bool,
}

impl From<CategoryRequest> for CategoryDraft {
    fn from(r: CategoryRequest) -> Self {
        CategoryDraft { name: r.name, description: r.description, parent_id: r.parent_id, status: r.status, featured: r.featured }
    }
}

/// Storefront listing; defaults to active categories.
pub async fn list_categories(State(s): State<AppState>, Query(p): Query<CategoryParams>) -> ApiResult<Json<Value>> {
    let mut filter = p.into_filter()?;
    filter.status = filter.status.or(Some(CategoryStatus::Active));
    Ok(Json(json!({ "categories": s.list_categories(&filter).await? })))
}

pub async fn admin_list_categories(
    _admin: AdminUser,
    State(s): State<AppState>,
    Query(p): Query<CategoryParams>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "categories": s.list_categories(&p.into_filter()?).await? })))
}

pub async fn get_category(_admin: AdminUser, State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "category": s.category(id).await? })))
}

pub async fn create_category(
    _admin: AdminUser,
    State(s): State<AppState>,
    ValidatedJson(r): ValidatedJson<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let category = s.create_category(r.into()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "category": category }))))
}

pub async fn update_category(
    _admin: AdminUser,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<CategoryRequest>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "category": s.update_category(id, r.into()).await? })))
}

pub async fn delete_category(_admin: AdminUser, State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    let deleted = s.delete_category(id).await?;
    let text = if deleted > 1 {
        format!("Category and {} subcategories deleted successfully", deleted - 1)
    } else {
        "Category deleted successfully".to_string()
    };
    Ok(message(&text))
}
