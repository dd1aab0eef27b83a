use cookie::{Cookie, CookieJar};
use http::{HeaderMap, HeaderValue, header};
use std::sync::Mutex;
use time::{Duration, OffsetDateTime};

/// Client-side cookie store, playing the part the browser plays for the
/// HTTP-only session cookies.
#[derive(Default)]
pub struct SessionCookies {
    jar: Mutex<CookieJar>,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every `Set-Cookie` header, dropping cookies the server expired.
    pub fn absorb(&self, headers: &HeaderMap) {
        let mut jar = self.lock();
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Ok(cookie) = Cookie::parse(raw.to_owned()) else { continue };

            if is_removal(&cookie) {
                jar.remove(Cookie::from(cookie.name().to_owned()));
            } else {
                jar.add(Cookie::new(cookie.name().to_owned(), cookie.value().to_owned()));
            }
        }
    }

    /// The `Cookie` request header for the current jar, if it holds anything.
    pub fn header(&self) -> Option<HeaderValue> {
        let jar = self.lock();
        let joined = jar
            .iter()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; ");
        if joined.is_empty() {
            return None;
        }
        HeaderValue::from_str(&joined).ok()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).map(|c| c.value().to_string())
    }

    pub fn set(&self, name: &str, value: &str) {
        self.lock()
            .add(Cookie::new(name.to_owned(), value.to_owned()));
    }

    pub fn clear(&self) {
        *self.lock() = CookieJar::new();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_removal(cookie: &Cookie<'_>) -> bool {
    if cookie.value().is_empty() {
        return true;
    }
    if cookie.max_age().is_some_and(|age| age <= Duration::ZERO) {
        return true;
    }
    cookie
        .expires_datetime()
        .is_some_and(|at| at <= OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_cookie(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for v in values {
            headers.append(header::SET_COOKIE, v.parse().unwrap());
        }
        headers
    }

    #[test]
    fn absorbs_and_replays_cookies() {
        let jar = SessionCookies::new();
        jar.absorb(&set_cookie(&[
            "access_token=a1; HttpOnly; Path=/; Max-Age=900; SameSite=Strict",
            "refresh_token=r1; HttpOnly; Path=/; Max-Age=604800; SameSite=Strict",
        ]));

        assert_eq!(jar.get("access_token").as_deref(), Some("a1"));
        let header = jar.header().unwrap();
        let header = header.to_str().unwrap();
        assert!(header.contains("access_token=a1"));
        assert!(header.contains("refresh_token=r1"));
    }

    #[test]
    fn expired_cookies_are_dropped() {
        let jar = SessionCookies::new();
        jar.set("access_token", "a1");
        jar.set("refresh_token", "r1");

        jar.absorb(&set_cookie(&[
            "access_token=; HttpOnly; Path=/; Max-Age=0",
            "refresh_token=r1; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        ]));

        assert_eq!(jar.get("access_token"), None);
        assert_eq!(jar.get("refresh_token"), None);
        assert!(jar.header().is_none());
    }
}
