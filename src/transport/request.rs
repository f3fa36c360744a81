//! Request description and fetched page.

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use scraper::Html;
use url::Url;

use crate::extract::error_message;
use crate::{Result, S1Error};

/// Notice text the forum shows when a client refreshes too quickly.
const THROTTLE_MARKERS: &[&str] = &["刷新过于频繁", "请求过于频繁"];

/// Body of an outbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
    /// `application/json` document.
    Json(serde_json::Value),
}

/// One outbound request, relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: RequestBody,
    pub(crate) rate_limited: bool,
}

impl RequestSpec {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            rate_limited: true,
        }
    }

    /// A GET request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A POST request for `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Add a header, overriding the default of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send form fields as the body.
    pub fn form<K, V, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Send a JSON document as the body.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Skip request spacing for this request.
    pub fn unthrottled(mut self) -> Self {
        self.rate_limited = false;
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path or absolute URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether request spacing applies.
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited
    }
}

/// A response as returned by the forum.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status.
    pub status: StatusCode,
    /// Final URL after redirects.
    pub url: Url,
    /// Response headers.
    pub headers: HeaderMap,
    /// Decoded body.
    pub body: String,
}

impl FetchedPage {
    /// Parse the body as an HTML document.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the body contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.body.contains(needle)
    }

    /// Turn throttling and server failures into retryable errors.
    ///
    /// Other statuses pass through; the body is still worth extracting.
    pub fn check(self) -> Result<Self> {
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            return Err(S1Error::RateLimit(format!("HTTP 429 from {}", self.url)));
        }
        if self.status.is_server_error() {
            return Err(S1Error::Network(format!("HTTP {} from {}", self.status, self.url)));
        }
        if self.is_throttle_notice() {
            return Err(S1Error::RateLimit(format!("throttled by {}", self.url)));
        }
        Ok(self)
    }

    /// Whether the forum's notice region carries a throttle message.
    ///
    /// The same phrase in a title or a post is ordinary content.
    fn is_throttle_notice(&self) -> bool {
        if !THROTTLE_MARKERS.iter().any(|m| self.body.contains(m)) {
            return false;
        }
        error_message(&self.body)
            .is_some_and(|notice| THROTTLE_MARKERS.iter().any(|m| notice.contains(m)))
    }
}
