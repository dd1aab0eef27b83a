use axum::http::HeaderMap;
use time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::config::CookieConfig;
use crate::models::jwt::IssuedToken;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
const HTTP_ONLY: bool = true;
const SAME_SITE: tower_cookies::cookie::SameSite = tower_cookies::cookie::SameSite::Strict;

/// Writes and reads the two session cookies.
#[derive(Clone)]
pub struct CookieService {
    secure: bool,
}

impl CookieService {
    pub fn new(config: &CookieConfig) -> Self {
        Self {
            secure: config.secure,
        }
    }

    pub fn set_auth_cookies(&self, cookies: &Cookies, access: &IssuedToken, refresh: &IssuedToken) {
        self.set_access_cookie(cookies, access);
        cookies.add(self.create_cookie(REFRESH_TOKEN_COOKIE, &refresh.token, refresh.lifetime));
    }

    pub fn set_access_cookie(&self, cookies: &Cookies, access: &IssuedToken) {
        cookies.add(self.create_cookie(ACCESS_TOKEN_COOKIE, &access.token, access.lifetime));
    }

    pub fn clear_auth_cookies(&self, cookies: &Cookies) {
        cookies.add(self.create_removal_cookie(ACCESS_TOKEN_COOKIE));
        cookies.add(self.create_removal_cookie(REFRESH_TOKEN_COOKIE));
    }

    /// The refresh cookie as seen by a handler behind the cookie manager.
    pub fn refresh_token(cookies: &Cookies) -> Option<String> {
        cookies
            .get(REFRESH_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Read a cookie straight from request headers, for code that runs
    /// outside the cookie manager layer.
    pub fn extract(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get_all(axum::http::header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn create_cookie(&self, name: &'static str, value: &str, lifetime: chrono::Duration) -> Cookie<'static> {
        Cookie::build((name, value.to_string()))
            .secure(self.secure)
            .http_only(HTTP_ONLY)
            .same_site(SAME_SITE)
            .path("/")
            .max_age(Duration::seconds(lifetime.num_seconds()))
            .build()
    }

    fn create_removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        Cookie::build((name, ""))
            .secure(self.secure)
            .http_only(HTTP_ONLY)
            .same_site(SAME_SITE)
            .path("/")
            .max_age(Duration::ZERO)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_finds_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            "theme=dark; refresh_token=abc.def.ghi; access_token=xyz".parse().unwrap(),
        );

        assert_eq!(
            CookieService::extract(&headers, REFRESH_TOKEN_COOKIE).as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(
            CookieService::extract(&headers, ACCESS_TOKEN_COOKIE).as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn extract_ignores_prefix_lookalikes_and_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            "refresh_token_old=stale; refresh_token=".parse().unwrap(),
        );

        assert_eq!(CookieService::extract(&headers, REFRESH_TOKEN_COOKIE), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let service = CookieService::new(&CookieConfig { secure: true });
        let cookie = service.create_cookie(ACCESS_TOKEN_COOKIE, "tok", chrono::Duration::minutes(15));

        assert!(cookie.http_only().unwrap_or(false));
        assert!(cookie.secure().unwrap_or(false));
        assert_eq!(cookie.same_site(), Some(SAME_SITE));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::minutes(15)));
    }
}
