use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_cookies::Cookies;

use crate::error::AppResult;
use crate::models::user::UserProfile;
use crate::services::cookie_service::CookieService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    message: &'static str,
    user: UserProfile,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    message: &'static str,
    access_token: String,
    expires_in: i64,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .auth
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": user.id }))))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let outcome = state.auth.login(&payload.email, &payload.password).await?;
    state
        .cookies
        .set_auth_cookies(&cookies, &outcome.tokens.access, &outcome.tokens.refresh);

    Ok(Json(LoginResponse {
        message: "Login successful",
        user: outcome.user.into(),
    }))
}

/// Trade the refresh cookie for a new access token. On failure nothing is set.
pub async fn refresh(
    State(state): State<AppState>,
    cookies: Cookies,
) -> AppResult<Json<RefreshResponse>> {
    let token = CookieService::refresh_token(&cookies);
    let access = state.auth.refresh(token.as_deref()).await?;
    state.cookies.set_access_cookie(&cookies, &access);

    Ok(Json(RefreshResponse {
        message: "Access token refreshed",
        expires_in: access.lifetime.num_seconds(),
        access_token: access.token,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
) -> AppResult<impl IntoResponse> {
    let token = CookieService::refresh_token(&cookies);
    state.auth.logout(token.as_deref()).await?;
    state.cookies.clear_auth_cookies(&cookies);

    Ok(Json(json!({ "message": "Logged out" })))
}
