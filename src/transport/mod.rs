//! HTTP transport for the forum.
//!
//! A single [`Transport`] owns the HTTP client, the cookie jar, the request
//! spacer and the persisted session. It is constructed once and lent by
//! reference to every API object; nothing here is global.
//!
//! Every exchange:
//! - waits for request spacing (unless the request opts out)
//! - sends the browser-like default headers plus caller overrides
//! - writes the cookie jar back to the session file afterwards
//!
//! The transport never retries; see [`crate::retry`].

mod jar;
mod request;

pub use jar::SessionJar;
pub use request::{FetchedPage, RequestBody, RequestSpec};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, Method};
use tracing::{debug, warn};
use url::Url;

use crate::config::{ClientConfig, Config};
use crate::models::UserIdentity;
use crate::rate_limit::{RequestSpacer, SpacingConfig};
use crate::session::SessionStore;
use crate::{Result, S1Error};

/// Headers a desktop browser sends on a top-level navigation.
///
/// Names must be lowercase for `HeaderName::from_static`.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "zh-CN,zh;q=0.9,en;q=0.8"),
    ("accept-encoding", "gzip, deflate"),
    ("dnt", "1"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("cache-control", "max-age=0"),
];

/// Authenticated HTTP session against the forum.
#[derive(Debug)]
pub struct Transport {
    client: Client,
    jar: Arc<SessionJar>,
    base_url: Url,
    user_agent: String,
    spacer: RequestSpacer,
    session: Mutex<SessionStore>,
}

impl Transport {
    /// Create a transport, seeding its cookie jar from `session`.
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| S1Error::Config(format!("invalid base_url {}: {e}", config.base_url)))?;

        let jar = Arc::new(SessionJar::new());
        jar.load(&session.cookies(), &base_url);

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .cookie_provider(Arc::clone(&jar))
            .gzip(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| S1Error::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            jar,
            base_url,
            user_agent: config.user_agent.clone(),
            spacer: RequestSpacer::new(SpacingConfig::from_client_config(config)),
            session: Mutex::new(session),
        })
    }

    /// Create a transport from the full configuration, opening the session file.
    pub fn from_config(config: &Config) -> Result<Self> {
        let session = SessionStore::open(
            config.session.session_path(),
            Duration::from_secs(config.session.expires_in_secs),
        );
        Self::new(&config.client, session)
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path (or an absolute URL) against the base URL.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        Url::parse(&raw).map_err(|e| S1Error::Parse(format!("invalid request URL {raw}: {e}")))
    }

    /// Browser-like headers sent with every request.
    pub fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        for (name, value) in BROWSER_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        headers
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> Result<FetchedPage> {
        self.send(RequestSpec::get(path)).await
    }

    /// POST form `fields` to `path`.
    pub async fn post_form<K, V, I>(&self, path: &str, fields: I) -> Result<FetchedPage>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.send(RequestSpec::post(path).form(fields)).await
    }

    /// Issue one request.
    ///
    /// Network failures surface as [`S1Error::Network`]; any HTTP status is
    /// returned as a page for the caller to interpret.
    pub async fn send(&self, spec: RequestSpec) -> Result<FetchedPage> {
        if spec.rate_limited {
            self.spacer.wait().await;
        } else {
            self.spacer.mark();
        }

        let url = self.url_for(&spec.path)?;
        let headers = self.request_headers(&spec)?;
        debug!("{} {}", spec.method, url);

        let mut builder = self
            .client
            .request(spec.method.clone(), url.clone())
            .headers(headers);
        if !spec.query.is_empty() {
            builder = builder.query(&spec.query);
        }
        builder = match spec.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Json(value) => builder.json(&value),
        };

        let result = builder.send().await;
        // cookies set before a failure (e.g. on a redirect hop) still count
        self.persist_cookies();
        let response = result?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.text().await?;
        self.persist_cookies();

        debug!("{} {} -> {} ({} bytes)", spec.method, url, status, body.len());
        Ok(FetchedPage {
            status,
            url: final_url,
            headers,
            body,
        })
    }

    fn request_headers(&self, spec: &RequestSpec) -> Result<HeaderMap> {
        let mut headers = self.default_headers();
        for (name, value) in &spec.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| S1Error::Parse(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| S1Error::Parse(format!("invalid header value for {name}: {e}")))?;
            headers.insert(name, value);
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        if let Ok(base) = HeaderValue::from_str(base) {
            headers.insert(REFERER, base.clone());
            if spec.method == Method::POST {
                headers.insert(ORIGIN, base);
            }
        }
        Ok(headers)
    }

    /// Write the live cookie jar to the session file.
    fn persist_cookies(&self) {
        let cookies = self.jar.snapshot(&self.base_url);
        if let Err(e) = self.session().save_cookies(cookies) {
            warn!("Failed to persist cookies: {}", e);
        }
    }

    fn session(&self) -> MutexGuard<'_, SessionStore> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the logged-in user in the session file.
    pub fn set_user(&self, user: UserIdentity) -> Result<()> {
        self.session().set_user(user)
    }

    /// Logged-in user recorded in the session, if any.
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.session().user().cloned()
    }

    /// Whether the session holds cookies and a user identity.
    pub fn has_session(&self) -> bool {
        self.session().is_logged_in()
    }

    /// Drop all cookies and delete the session file.
    pub fn clear_session(&self) -> Result<()> {
        self.jar.clear();
        self.session().clear()
    }

    /// Time of the most recent request.
    pub fn last_request(&self) -> Option<tokio::time::Instant> {
        self.spacer.last_request()
    }
}
