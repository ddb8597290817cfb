use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

/// DB row for `users`. `password` holds the bcrypt hash.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub login: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            login: u.login,
            email: u.email,
        }
    }
}

/// Body for POST /api/admin/user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub login: String,
    pub email: String,
    pub password: String,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let len = self.login.chars().count();
        if !(3..=20).contains(&len) {
            return Err(AppError::Validation(
                "login should have at least 3 characters and at most 20".into(),
            ));
        }
        if self.email.parse::<lettre::Address>().is_err() {
            return Err(AppError::Validation("email is not a valid address".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("password must not be empty".into()));
        }
        Ok(())
    }
}

/// Row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password_hash: String,
}

/// Form body for POST /token (OAuth2 password grant).
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}
