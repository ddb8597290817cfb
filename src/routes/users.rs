use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::{
    error::AppError,
    middleware::extract::AppJson,
    models::{
        auth::AuthenticatedUser,
        user::{CreateUserRequest, UserResponse},
    },
    services::auth::AuthService,
    AppState,
};

/// GET /api/admin/user
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/admin/user. Open while the user table is empty so the first
/// account can be created; requires a token afterwards.
pub async fn create_user(
    State(state): State<AppState>,
    caller: Result<AuthenticatedUser, AppError>,
    AppJson(body): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if let Err(rejection) = caller {
        if state.store.count_users().await? > 0 {
            return Err(rejection);
        }
        info!("No users yet, creating initial account '{}'", body.login);
    }

    let user = AuthService::create_user(state.store.as_ref(), &body).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}
