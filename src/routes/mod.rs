pub mod auth;
pub mod health;
pub mod menu;
pub mod positions;
pub mod users;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::auth::JwtKeys;
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any);

    let jwt_keys = JwtKeys::from_config(&state.config);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/token", post(auth::issue_token))
        // Public menu
        .route("/api/menu", get(menu::list_menus).post(menu::create_menu))
        .route(
            "/api/menu/{id}",
            get(menu::get_menu)
                .put(menu::update_menu)
                .patch(menu::patch_menu)
                .delete(menu::delete_menu),
        )
        // Admin menu
        .route("/api/admin/menu", get(menu::list_menus_admin).post(menu::create_menu))
        .route(
            "/api/admin/menu/{id}",
            get(menu::get_menu_admin)
                .put(menu::update_menu)
                .patch(menu::patch_menu)
                .delete(menu::delete_menu),
        )
        .route("/api/admin/menu/{id}/add_position/{position_id}", post(menu::add_position))
        .route("/api/admin/menu/{id}/remove_position/{position_id}", post(menu::remove_position))
        // Menu positions
        .route(
            "/api/admin/menu/menu_position",
            get(positions::list_positions).post(positions::create_position),
        )
        .route(
            "/api/admin/menu/menu_position/{id}",
            get(positions::get_position)
                .put(positions::update_position)
                .patch(positions::patch_position)
                .delete(positions::delete_position),
        )
        // Users
        .route("/api/admin/user", get(users::list_users).post(users::create_user))
        .layer(Extension(jwt_keys))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
