use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::config::Config;
use crate::error::AppError;
use crate::models::auth::{AuthenticatedUser, Claims};

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".into()))?;

        let keys = parts
            .extensions
            .get::<JwtKeys>()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("JWT keys not configured")))?;

        decode_access_token(token, keys)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
    }
}

/// Extension type to carry the JWT signing settings through request extensions.
#[derive(Clone)]
pub struct JwtKeys {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_seconds: u64,
}

impl JwtKeys {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            algorithm: config.jwt_algorithm,
            ttl_seconds: config.jwt_expiry_seconds,
        }
    }
}

pub fn decode_access_token(token: &str, keys: &JwtKeys) -> Result<AuthenticatedUser, anyhow::Error> {
    let key = DecodingKey::from_secret(keys.secret.as_bytes());
    let mut validation = Validation::new(keys.algorithm);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation)?;
    let claims = data.claims;

    Ok(AuthenticatedUser {
        user_id: claims.sub.parse()?,
        login: claims.login,
    })
}
