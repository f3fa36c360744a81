//! Caller-facing forum operations.
//!
//! Each API object borrows the shared [`Transport`] and carries its own
//! [`RetryPolicy`]:
//! - [`AuthApi`]: login, session check, logout, daily check-in
//! - [`ForumApi`]: board list and topic lists
//! - [`TopicApi`]: topic pages, new topics and replies
//! - [`SearchApi`]: keyword search
//!
//! Every request an operation issues goes through the retry policy on its
//! own, so a submission is only ever re-sent after a transient failure.

mod auth;
mod checkin;
mod forum;
mod search;
mod topic;

pub use auth::AuthApi;
pub use forum::ForumApi;
pub use search::SearchApi;
pub use topic::TopicApi;

use scraper::Html;

use crate::extract::find_formhash;
use crate::retry::RetryPolicy;
use crate::transport::{FetchedPage, RequestSpec, Transport};
use crate::{Result, S1Error};

/// Maximum length for topic titles (in characters).
pub const MAX_TITLE_LENGTH: usize = 80;

/// Maximum length for message bodies (in characters).
pub const MAX_BODY_LENGTH: usize = 10_000;

/// Send `spec` under `retry`, turning throttle notices and server errors
/// into retryable failures.
pub(crate) async fn fetch(
    transport: &Transport,
    retry: &RetryPolicy,
    label: &str,
    spec: RequestSpec,
) -> Result<FetchedPage> {
    retry
        .run(label, || {
            let spec = spec.clone();
            async move { transport.send(spec).await?.check() }
        })
        .await
}

/// The form token of a page body.
pub(crate) fn formhash_of(body: &str) -> Option<String> {
    find_formhash(&Html::parse_document(body))
}

/// Current time as unix seconds, as the compose forms expect.
pub(crate) fn unix_time() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Validate a topic title.
pub(crate) fn validate_title(title: &str) -> Result<()> {
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(S1Error::Validation(format!(
            "title is too long (at most {} characters)",
            MAX_TITLE_LENGTH
        )));
    }
    if title.trim().is_empty() {
        return Err(S1Error::Validation("title must not be empty".to_string()));
    }
    Ok(())
}

/// Validate a message body.
pub(crate) fn validate_body(body: &str) -> Result<()> {
    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(S1Error::Validation(format!(
            "message is too long (at most {} characters)",
            MAX_BODY_LENGTH
        )));
    }
    if body.trim().is_empty() {
        return Err(S1Error::Validation("message must not be empty".to_string()));
    }
    Ok(())
}

/// Validate a numeric identifier argument.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(S1Error::Validation(format!("invalid {kind} id: '{id}'")));
    }
    Ok(())
}
