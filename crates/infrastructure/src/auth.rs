//! JWT 令牌服务
//!
//! HS256 签名，令牌绑定用户 id 和邮箱，并携带 issuer、audience、过期时间
//! 和唯一 id（jti）。

use application::{AuthToken, TokenClaims, TokenError, TokenService};
use chrono::{DateTime, Duration, Utc};
use config::JwtConfig;
use domain::{UserEmail, UserId};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    email: String,
    iss: String,
    aud: String,
    exp: i64, // 过期时间 (Unix timestamp)
    iat: i64,
    jti: String,
}

#[derive(Clone)]
pub struct JwtTokenService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user_id: UserId, email: &UserEmail) -> Result<AuthToken, TokenError> {
        let now = Utc::now();
        let expires_at = Duration::try_hours(self.config.expiration_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                TokenError::Generation(format!(
                    "token lifetime of {} hours is out of range",
                    self.config.expiration_hours
                ))
            })?;

        let claims = Claims {
            sub: user_id.value(),
            email: email.as_str().to_owned(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| TokenError::Generation(err.to_string()))?;
        Ok(AuthToken::bearer(token, expires_at))
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(err.to_string()),
            })?;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::Invalid("exp out of range".to_string()))?;

        Ok(TokenClaims {
            user_id: UserId::new(claims.sub),
            email: claims.email,
            expires_at,
        })
    }
}
