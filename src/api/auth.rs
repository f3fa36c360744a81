//! Login, session check and logout.

use scraper::Html;
use tracing::{debug, info, warn};

use super::{fetch, formhash_of};
use crate::config::Config;
use crate::extract::{
    error_message, find_current_user, find_formhash, find_loginhash, has_logout_link,
    visible_text,
};
use crate::models::UserIdentity;
use crate::retry::RetryPolicy;
use crate::transport::{RequestSpec, Transport};
use crate::{Result, S1Error};

/// Login page carrying the form tokens.
const LOGIN_PAGE: &str = "member.php?mod=logging&action=login";

/// Page only a logged-in user can see.
const PROFILE_PAGE: &str = "home.php?mod=space&do=profile";

/// Markers of an accepted login.
const LOGIN_SUCCESS: &[&str] = &["succeedhandle", "欢迎"];

/// Markers of a rejected login.
const LOGIN_FAILURE: &[&str] = &["登录失败", "密码错误"];

/// Requested cookie lifetime in seconds (30 days).
const COOKIE_LIFETIME: &str = "2592000";

/// Authentication operations.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    pub(super) transport: &'a Transport,
    pub(super) retry: RetryPolicy,
}

impl<'a> AuthApi<'a> {
    /// Create with the default retry policy.
    pub fn new(transport: &'a Transport) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
        }
    }

    /// Create with the retry policy from `config`.
    pub fn from_config(transport: &'a Transport, config: &Config) -> Self {
        Self::new(transport).with_retry(RetryPolicy::from_config(&config.retry))
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Log in and record the user in the session.
    ///
    /// A response that neither confirms nor rejects the login is settled
    /// by [`AuthApi::check_login`].
    pub async fn login(&self, username: &str, password: &str) -> Result<UserIdentity> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(S1Error::Validation(
                "username and password are required".to_string(),
            ));
        }
        info!("Logging in as {}", username);

        let page = fetch(
            self.transport,
            &self.retry,
            "load login page",
            RequestSpec::get(LOGIN_PAGE),
        )
        .await?;
        let (formhash, loginhash) = login_tokens(&page.body);
        let formhash = formhash
            .ok_or_else(|| S1Error::Authentication("formhash not found on login page".into()))?;
        if loginhash.is_none() {
            debug!("Login page has no loginhash");
        }

        let response = fetch(
            self.transport,
            &self.retry,
            "submit login",
            login_request(username, password, &formhash, loginhash.as_deref()),
        )
        .await?;
        let body = response.body;

        if LOGIN_SUCCESS.iter().any(|m| body.contains(m)) {
            return self.record_user(username, response_uid(&body));
        }
        if LOGIN_FAILURE.iter().any(|m| body.contains(m)) {
            let message = error_message(&body).unwrap_or_else(|| visible_text(&body));
            warn!("Login rejected for {}: {}", username, message);
            return Err(S1Error::Authentication(format!("login failed: {message}")));
        }

        debug!("Login response is ambiguous; checking the session");
        if self.check_login().await? {
            self.record_user(username, response_uid(&body))
        } else {
            Err(S1Error::Authentication(
                "login was not confirmed by the forum".to_string(),
            ))
        }
    }

    fn record_user(&self, username: &str, uid: Option<String>) -> Result<UserIdentity> {
        let user = UserIdentity::logged_in_now(username, uid);
        self.transport.set_user(user.clone())?;
        info!("Logged in as {}", username);
        Ok(user)
    }

    /// Whether the session cookies are still accepted by the forum.
    ///
    /// Only network-level failures are errors; a logged-out session is
    /// `Ok(false)`.
    pub async fn check_login(&self) -> Result<bool> {
        let page = fetch(
            self.transport,
            &self.retry,
            "check login",
            RequestSpec::get(PROFILE_PAGE),
        )
        .await?;
        let user = find_current_user(&page.document());
        let logged_in = user.is_some() || has_logout_link(&page.body);
        debug!("Session check: logged_in={} user={:?}", logged_in, user);
        Ok(logged_in)
    }

    /// Log out and clear the local session.
    ///
    /// Local state is cleared even when the logout request fails; the
    /// request's error is returned afterwards.
    pub async fn logout(&self) -> Result<()> {
        let result = self.submit_logout().await;
        self.transport.clear_session()?;
        match &result {
            Ok(()) => info!("Logged out"),
            Err(e) => warn!("Logout request failed, local session cleared anyway: {}", e),
        }
        result
    }

    async fn submit_logout(&self) -> Result<()> {
        let page = fetch(
            self.transport,
            &self.retry,
            "load logout token",
            RequestSpec::get("index.php"),
        )
        .await?;

        let mut spec = RequestSpec::get("member.php")
            .query("mod", "logging")
            .query("action", "logout");
        match formhash_of(&page.body) {
            Some(formhash) => spec = spec.query("formhash", formhash),
            None => warn!("No formhash for logout; sending without"),
        }
        fetch(self.transport, &self.retry, "logout", spec).await?;
        Ok(())
    }

    /// User recorded in the local session, if any.
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.transport.current_user()
    }

    /// Whether the local session holds cookies and a user.
    pub fn has_session(&self) -> bool {
        self.transport.has_session()
    }
}

/// `formhash` and `loginhash` of the login page.
fn login_tokens(body: &str) -> (Option<String>, Option<String>) {
    let doc = Html::parse_document(body);
    (find_formhash(&doc), find_loginhash(&doc))
}

fn login_request(
    username: &str,
    password: &str,
    formhash: &str,
    loginhash: Option<&str>,
) -> RequestSpec {
    let (path, handlekey) = match loginhash {
        Some(hash) => (
            format!("{LOGIN_PAGE}&loginsubmit=yes&loginhash={hash}"),
            format!("ls{hash}"),
        ),
        None => (format!("{LOGIN_PAGE}&loginsubmit=yes"), "ls".to_string()),
    };
    RequestSpec::post(path).form([
        ("mod", "logging"),
        ("action", "login"),
        ("loginsubmit", "yes"),
        ("infloat", "yes"),
        ("lssubmit", "yes"),
        ("inajax", "1"),
        ("username", username),
        ("password", password),
        ("questionid", "0"),
        ("answer", ""),
        ("cookietime", COOKIE_LIFETIME),
        ("quickforward", "yes"),
        ("handlekey", handlekey.as_str()),
        ("formhash", formhash),
    ])
}

/// User id exposed by a login response, as a profile link or in the
/// success callback's parameters.
fn response_uid(body: &str) -> Option<String> {
    ["uid-", "uid=", "'uid':'", "\"uid\":\""]
        .iter()
        .find_map(|marker| {
            let (_, rest) = body.split_once(marker)?;
            let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            (!id.is_empty()).then_some(id)
        })
}
