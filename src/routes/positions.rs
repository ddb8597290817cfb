use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppError,
    middleware::extract::{AppJson, AppPath, AppQuery},
    models::{
        auth::AuthenticatedUser,
        menu::{
            CreatePositionRequest, MenuPosition, PatchPositionRequest, PositionChanges, PositionFilter,
            UpdatePositionRequest,
        },
    },
    services::positions::PositionService,
    AppState,
};

pub async fn list_positions(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppQuery(filter): AppQuery<PositionFilter>,
) -> Result<Json<Vec<MenuPosition>>, AppError> {
    PositionService::list(state.store.as_ref(), &filter).await.map(Json)
}

pub async fn get_position(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> Result<Json<MenuPosition>, AppError> {
    PositionService::get(state.store.as_ref(), id).await.map(Json)
}

pub async fn create_position(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppJson(body): AppJson<CreatePositionRequest>,
) -> Result<(StatusCode, Json<MenuPosition>), AppError> {
    body.validate()?;
    let position = PositionService::create(state.store.as_ref(), body, state.config.today()).await?;
    Ok((StatusCode::CREATED, Json(position)))
}

pub async fn update_position(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath(id): AppPath<i32>,
    AppJson(body): AppJson<UpdatePositionRequest>,
) -> Result<Json<MenuPosition>, AppError> {
    body.validate()?;
    let changes = PositionChanges::from(body);
    PositionService::update(state.store.as_ref(), id, &changes, state.config.today())
        .await
        .map(Json)
}

pub async fn patch_position(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath(id): AppPath<i32>,
    AppJson(body): AppJson<PatchPositionRequest>,
) -> Result<Json<MenuPosition>, AppError> {
    body.validate()?;
    let changes = PositionChanges::from(body);
    PositionService::update(state.store.as_ref(), id, &changes, state.config.today())
        .await
        .map(Json)
}

pub async fn delete_position(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> Result<Json<MenuPosition>, AppError> {
    PositionService::delete(state.store.as_ref(), id).await.map(Json)
}
