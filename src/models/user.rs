//! User identity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the logged-in user, persisted with the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Login name.
    pub username: String,
    /// Numeric user ID, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Time of the last successful login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserIdentity {
    /// Identity for a user who just logged in.
    pub fn logged_in_now(username: impl Into<String>, uid: Option<String>) -> Self {
        Self {
            username: username.into(),
            uid,
            last_login: Some(Utc::now()),
        }
    }
}
