use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::{jwt::TokenKind, role::Role},
    services::cookie_service::{ACCESS_TOKEN_COOKIE, CookieService},
    state::AppState,
};

/// Identity taken from a verified access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub role: Role,
    pub email: Option<String>,
}

/// Require a valid access token, from the `access_token` cookie or an
/// `Authorization: Bearer` header. No store lookup: access tokens are
/// stateless and stay valid until they expire.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)
        .or_else(|| CookieService::extract(request.headers(), ACCESS_TOKEN_COOKIE))
        .ok_or_else(|| AppError::Unauthorized("missing access token".to_string()))?;

    let claims = state
        .jwt
        .verify(TokenKind::Access, &token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    request.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        role: claims.role,
        email: claims.email,
    });

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
