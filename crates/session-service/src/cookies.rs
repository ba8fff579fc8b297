//! Session cookie construction.
//!
//! Both cookies are `HttpOnly`, `SameSite=Lax`, scoped to `/`, and `Secure`
//! in production. Max-age follows the token lifetime.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::jwt::{ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_TTL, REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_TTL};
use std::time::Duration;

/// Flags applied to every session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Cookie carrying a freshly issued access token (15 minutes).
    pub fn access_cookie(&self, token: String) -> Cookie<'static> {
        self.build(ACCESS_TOKEN_COOKIE, token, ACCESS_TOKEN_TTL)
    }

    /// Cookie carrying a freshly issued refresh token (7 days).
    pub fn refresh_cookie(&self, token: String) -> Cookie<'static> {
        self.build(REFRESH_TOKEN_COOKIE, token, REFRESH_TOKEN_TTL)
    }

    /// Add both session cookies to `jar`.
    pub fn set_session(&self, jar: CookieJar, access: String, refresh: String) -> CookieJar {
        jar.add(self.access_cookie(access))
            .add(self.refresh_cookie(refresh))
    }

    /// Expire both session cookies.
    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.removal(ACCESS_TOKEN_COOKIE))
            .add(self.removal(REFRESH_TOKEN_COOKIE))
    }

    fn build(&self, name: &'static str, value: String, ttl: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(common::jwt::ttl_seconds(ttl)))
            .build()
    }

    fn removal(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.build(name, String::new(), Duration::ZERO);
        cookie.make_removal();
        cookie
    }
}
