use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
#[cfg(test)]
mod tests;

pub use state::AppState;

pub const REFRESH_PATH: &str = "/api/auth/refresh";

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/api/users/me", get(api::user::get_current_user))
        .route("/api/admin/users", get(api::admin::list_users))
        .route_layer(from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(api::pages::home))
        .route("/login", get(api::pages::login))
        .route("/signup", get(api::pages::signup))
        .route("/admin", get(api::pages::admin))
        .route("/admin/{*rest}", get(api::pages::admin))
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/login", post(api::auth::login))
        .route(REFRESH_PATH, post(api::auth::refresh))
        .route("/api/auth/logout", post(api::auth::logout))
        .merge(protected)
        .layer(from_fn_with_state(
            state.clone(),
            crate::middleware::edge_guard::edge_guard,
        ))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
