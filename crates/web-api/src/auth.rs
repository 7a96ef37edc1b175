//! 请求认证
//!
//! 从 `Authorization: Bearer <token>` 中解析调用者，验证交给 `TokenService`。

use application::TokenError;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use domain::UserId;

use crate::{error::ApiError, state::AppState};

/// 已认证的调用者
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("invalid authorization header format"))?;

        let claims = state.token_service.verify(token).map_err(|err| match err {
            TokenError::Expired => ApiError::unauthorized("token expired"),
            other => {
                tracing::debug!(error = %other, "令牌验证失败");
                ApiError::unauthorized("invalid token")
            }
        })?;

        Ok(Self {
            user_id: claims.user_id,
            email: claims.email,
        })
    }
}
