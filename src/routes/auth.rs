use axum::{extract::State, Extension, Json};

use crate::{
    error::AppError,
    middleware::{auth::JwtKeys, extract::AppForm},
    models::user::{TokenRequest, TokenResponse},
    services::auth::AuthService,
    AppState,
};

/// POST /token (OAuth2 password grant, form encoded)
pub async fn issue_token(
    State(state): State<AppState>,
    Extension(keys): Extension<JwtKeys>,
    AppForm(form): AppForm<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if let Some(grant_type) = form.grant_type.as_deref() {
        if grant_type != "password" {
            return Err(AppError::Validation(format!(
                "Unsupported grant_type '{grant_type}', expected 'password'"
            )));
        }
    }

    let user = AuthService::authenticate(state.store.as_ref(), &form.username, &form.password).await?;
    let token = AuthService::issue_token(&user, &keys)?;
    tracing::debug!("Issued access token for '{}'", user.login);
    Ok(Json(token))
}
