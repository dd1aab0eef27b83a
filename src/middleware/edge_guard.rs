use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::config::GuardConfig;
use crate::models::jwt::TokenKind;
use crate::models::role::Role;
use crate::services::cookie_service::{CookieService, REFRESH_TOKEN_COOKIE};
use crate::services::jwt_service::JwtService;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    Redirect(String),
}

/// Coarse route gating on the refresh-token cookie.
///
/// Decisions only read the inbound token; nothing is persisted or issued here.
pub struct EdgeGuard {
    config: GuardConfig,
    jwt: JwtService,
}

impl EdgeGuard {
    pub fn new(config: GuardConfig, jwt: JwtService) -> Self {
        Self { config, jwt }
    }

    pub fn decide(&self, path: &str, refresh_token: Option<&str>) -> GuardDecision {
        if self.is_admin_path(path) {
            return match self.role_of(refresh_token) {
                Some(role) if role.is_admin() => GuardDecision::Pass,
                _ => GuardDecision::Redirect(self.config.login_path.clone()),
            };
        }

        if self.is_auth_page(path) {
            return match self.role_of(refresh_token) {
                Some(role) => GuardDecision::Redirect(self.landing_for(role).to_string()),
                None => GuardDecision::Pass,
            };
        }

        GuardDecision::Pass
    }

    fn landing_for(&self, role: Role) -> &str {
        match role {
            Role::SuperAdmin | Role::Admin => &self.config.admin_landing,
            Role::Instructor | Role::Student => &self.config.user_landing,
        }
    }

    // Any decoding failure counts as no token at all.
    fn role_of(&self, refresh_token: Option<&str>) -> Option<Role> {
        let token = refresh_token?;
        match self.jwt.verify(TokenKind::Refresh, token) {
            Ok(claims) => Some(claims.role),
            Err(e) => {
                debug!(error = %e, "Ignoring undecodable refresh cookie");
                None
            }
        }
    }

    fn is_admin_path(&self, path: &str) -> bool {
        self.config
            .admin_prefixes
            .iter()
            .any(|prefix| under_prefix(path, prefix))
    }

    fn is_auth_page(&self, path: &str) -> bool {
        let path = trim_trailing_slash(path);
        self.config
            .auth_pages
            .iter()
            .any(|page| trim_trailing_slash(page) == path)
    }
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = trim_trailing_slash(prefix);
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

pub async fn edge_guard(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = CookieService::extract(request.headers(), REFRESH_TOKEN_COOKIE);
    let path = request.uri().path().to_owned();

    match state.guard.decide(&path, token.as_deref()) {
        GuardDecision::Pass => next.run(request).await,
        GuardDecision::Redirect(to) => {
            debug!(path = %path, to = %to, "Edge guard redirect");
            Redirect::temporary(&to).into_response()
        }
    }
}
