//! Cookie jar that can be reset.
//!
//! `reqwest`'s jar has no way to drop cookies, which logout needs, so the
//! jar is wrapped and swapped out wholesale on clear.

use std::sync::RwLock;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use url::Url;

use crate::session::{parse_cookie_header, CookieMap};

/// Cookie store shared between the HTTP client and the transport.
#[derive(Debug, Default)]
pub struct SessionJar {
    inner: RwLock<Jar>,
}

impl SessionJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the jar with saved cookies for `url`.
    pub fn load(&self, cookies: &CookieMap, url: &Url) {
        let jar = self.inner.read().unwrap_or_else(|e| e.into_inner());
        for (name, value) in cookies {
            jar.add_cookie_str(&format!("{name}={value}; Path=/"), url);
        }
    }

    /// Cookies that would be sent to pages under `url`.
    ///
    /// `url` is read as a directory, so cookies scoped to `/2b/` are
    /// included for a base of `/2b`.
    pub fn snapshot(&self, url: &Url) -> CookieMap {
        self.cookies(&directory_of(url))
            .and_then(|value| value.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default()
    }

    /// Drop every cookie.
    pub fn clear(&self) {
        let mut jar = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *jar = Jar::default();
    }
}

fn directory_of(url: &Url) -> Url {
    let mut dir = url.clone();
    if !dir.path().ends_with('/') {
        let path = format!("{}/", dir.path());
        dir.set_path(&path);
    }
    dir
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let jar = self.inner.read().unwrap_or_else(|e| e.into_inner());
        jar.set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let jar = self.inner.read().unwrap_or_else(|e| e.into_inner());
        jar.cookies(url)
    }
}
