//! Custom assertions on session cookies in response headers.

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Custom assertions for `Set-Cookie` headers
///
/// # Example
/// ```rust,ignore
/// response
///     .headers()
///     .assert_sets_cookie("accessToken")
///     .assert_cookie_count(1);
/// ```
pub trait CookieAssertions {
    /// Every `Set-Cookie` header value
    fn set_cookies(&self) -> Vec<String>;

    /// The value of the named cookie, if it is being set
    fn cookie_value(&self, name: &str) -> Option<String>;

    /// Assert that the named cookie is set to a non-empty value
    fn assert_sets_cookie(&self, name: &str) -> &Self;

    /// Assert the exact number of `Set-Cookie` headers
    fn assert_cookie_count(&self, count: usize) -> &Self;
}

impl CookieAssertions for HeaderMap {
    fn set_cookies(&self) -> Vec<String> {
        self.get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().expect("Set-Cookie must be ASCII").to_string())
            .collect()
    }

    fn cookie_value(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies().into_iter().find_map(|cookie| {
            let pair = cookie.split(';').next()?.trim().to_string();
            pair.strip_prefix(&prefix).map(ToString::to_string)
        })
    }

    fn assert_sets_cookie(&self, name: &str) -> &Self {
        let value = self.cookie_value(name);
        assert!(
            value.as_deref().is_some_and(|v| !v.is_empty()),
            "expected Set-Cookie for {name}, got {:?}",
            self.set_cookies()
        );
        self
    }

    fn assert_cookie_count(&self, count: usize) -> &Self {
        let cookies = self.set_cookies();
        assert_eq!(
            cookies.len(),
            count,
            "expected {count} Set-Cookie headers, got {cookies:?}"
        );
        self
    }
}

/// Join `name=value` pairs into a `Cookie` request header.
pub fn cookie_header(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}
