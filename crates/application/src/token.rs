//! 访问令牌抽象
//!
//! 签名算法由基础设施层决定；应用层只关心令牌绑定的用户和过期时间。

use domain::{Timestamp, UserEmail, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token generation failed: {0}")]
    Generation(String),
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token expired")]
    Expired,
}

/// 签发给客户端的令牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Timestamp,
}

impl AuthToken {
    pub fn bearer(access_token: impl Into<String>, expires_at: Timestamp) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            expires_at,
        }
    }
}

/// 验证通过后的令牌内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub email: String,
    pub expires_at: Timestamp,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    /// 为用户签发令牌，携带 issuer、audience 和过期时间
    fn issue(&self, user_id: UserId, email: &UserEmail) -> Result<AuthToken, TokenError>;

    /// 校验签名、issuer、audience 和过期时间
    fn verify(&self, token: &str) -> Result<TokenClaims, TokenError>;
}
