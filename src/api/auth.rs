//! Caller identity, as forwarded by the upstream identity provider.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::ApiError;
use crate::EcommerceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: Option<String>,
    pub is_admin: bool,
}

/// A `CurrentUser` whose role is `admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser(pub CurrentUser);

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER).ok_or(EcommerceError::Unauthenticated)?;
        let is_admin = header(parts, USER_ROLE_HEADER).is_some_and(|role| role.eq_ignore_ascii_case("admin"));
        Ok(Self { id, name: header(parts, USER_NAME_HEADER), is_admin })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin { return Err(EcommerceError::Forbidden.into()); }
        Ok(Self(user))
    }
}
