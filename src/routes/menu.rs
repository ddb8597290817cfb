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
            CreateMenuRequest, MenuChanges, MenuFilter, MenuListQuery, MenuResponse, PatchMenuRequest,
            UpdateMenuRequest,
        },
    },
    services::menu::MenuService,
    AppState,
};

/// GET /api/menu, public
pub async fn list_menus(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MenuListQuery>,
) -> Result<Json<Vec<MenuResponse>>, AppError> {
    let filter = MenuFilter::try_from(query)?;
    MenuService::list(state.store.as_ref(), &filter).await.map(Json)
}

/// GET /api/admin/menu
pub async fn list_menus_admin(
    state: State<AppState>,
    _user: AuthenticatedUser,
    query: AppQuery<MenuListQuery>,
) -> Result<Json<Vec<MenuResponse>>, AppError> {
    list_menus(state, query).await
}

/// GET /api/menu/{id}, public
pub async fn get_menu(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<MenuResponse>, AppError> {
    MenuService::get(state.store.as_ref(), id).await.map(Json)
}

/// GET /api/admin/menu/{id}
pub async fn get_menu_admin(
    state: State<AppState>,
    _user: AuthenticatedUser,
    id: AppPath<i32>,
) -> Result<Json<MenuResponse>, AppError> {
    get_menu(state, id).await
}

pub async fn create_menu(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppJson(body): AppJson<CreateMenuRequest>,
) -> Result<(StatusCode, Json<MenuResponse>), AppError> {
    body.validate()?;
    let menu = MenuService::create(state.store.as_ref(), &body).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

/// PUT replaces the name and the whole position set.
pub async fn update_menu(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath(id): AppPath<i32>,
    AppJson(body): AppJson<UpdateMenuRequest>,
) -> Result<Json<MenuResponse>, AppError> {
    body.validate()?;
    let changes = MenuChanges::from(body);
    MenuService::update(state.store.as_ref(), id, &changes).await.map(Json)
}

pub async fn patch_menu(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath(id): AppPath<i32>,
    AppJson(body): AppJson<PatchMenuRequest>,
) -> Result<Json<MenuResponse>, AppError> {
    body.validate()?;
    let changes = MenuChanges::from(body);
    MenuService::update(state.store.as_ref(), id, &changes).await.map(Json)
}

pub async fn delete_menu(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath(id): AppPath<i32>,
) -> Result<Json<MenuResponse>, AppError> {
    MenuService::delete(state.store.as_ref(), id).await.map(Json)
}

/// POST /api/admin/menu/{id}/add_position/{position_id}
pub async fn add_position(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath((id, position_id)): AppPath<(i32, i32)>,
) -> Result<Json<MenuResponse>, AppError> {
    MenuService::add_position(state.store.as_ref(), id, position_id)
        .await
        .map(Json)
}

/// POST /api/admin/menu/{id}/remove_position/{position_id}
pub async fn remove_position(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    AppPath((id, position_id)): AppPath<(i32, i32)>,
) -> Result<Json<MenuResponse>, AppError> {
    MenuService::remove_position(state.store.as_ref(), id, position_id)
        .await
        .map(Json)
}
