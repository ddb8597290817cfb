use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::{
    db::Store,
    error::AppError,
    middleware::auth::JwtKeys,
    models::{
        auth::Claims,
        user::{CreateUserRequest, NewUser, TokenResponse, User},
    },
};

#[cfg(not(test))]
const BCRYPT_COST: u32 = 12;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

const BAD_CREDENTIALS: &str = "Incorrect username or password";

pub struct AuthService;

impl AuthService {
    pub async fn create_user(store: &dyn Store, req: &CreateUserRequest) -> Result<User, AppError> {
        req.validate()?;
        let password_hash = bcrypt::hash(&req.password, BCRYPT_COST).map_err(anyhow::Error::from)?;
        store
            .create_user(&NewUser {
                login: req.login.clone(),
                email: req.email.clone(),
                password_hash,
            })
            .await
    }

    /// Unknown login and wrong password are indistinguishable to the caller.
    pub async fn authenticate(store: &dyn Store, login: &str, password: &str) -> Result<User, AppError> {
        let user = store
            .find_user_by_login(login)
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.into()))?;

        let valid = bcrypt::verify(password, &user.password)
            .map_err(|_| AppError::Unauthorized(BAD_CREDENTIALS.into()))?;
        if !valid {
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
        }
        Ok(user)
    }

    pub fn issue_token(user: &User, keys: &JwtKeys) -> anyhow::Result<TokenResponse> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            login: user.login.clone(),
            iat: now,
            exp: now + keys.ttl_seconds as usize,
        };
        let access_token = encode(
            &Header::new(keys.algorithm),
            &claims,
            &EncodingKey::from_secret(keys.secret.as_bytes()),
        )?;
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".into(),
        })
    }
}
