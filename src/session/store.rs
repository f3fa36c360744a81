//! Persisted session state.
//!
//! The session file is a small TOML document:
//!
//! ```toml
//! cookies = "eyJhdXRoIjoi..."
//! created_at = "2026-10-18T09:00:00Z"
//! expires_in = 604800
//!
//! [user]
//! username = "alice"
//! uid = "12345"
//! last_login = "2026-10-18T09:00:00Z"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cookies::{decode_cookies, encode_cookies, CookieMap};
use crate::models::UserIdentity;
use crate::{Result, S1Error};

/// Default session lifetime (7 days).
pub const DEFAULT_SESSION_EXPIRES_SECS: u64 = 7 * 24 * 3600;

/// On-disk representation of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    cookies: String,
    created_at: DateTime<Utc>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserIdentity>,
}

fn default_expires_in() -> u64 {
    DEFAULT_SESSION_EXPIRES_SECS
}

/// Authenticated identity state kept between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Cookie jar snapshot.
    pub cookies: CookieMap,
    /// When the session was (last) saved.
    pub created_at: DateTime<Utc>,
    /// Lifetime measured from `created_at`.
    pub expires_in: Duration,
    /// Logged-in user, if any.
    pub user: Option<UserIdentity>,
}

impl Session {
    /// Create an empty session starting now.
    pub fn new(expires_in: Duration) -> Self {
        Self {
            cookies: CookieMap::new(),
            created_at: Utc::now(),
            expires_in,
            user: None,
        }
    }

    /// Absolute expiry time.
    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.expires_in)
            .ok()
            .and_then(|lifetime| self.created_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the session is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Whether the session is expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn to_file(&self) -> Result<SessionFile> {
        Ok(SessionFile {
            cookies: encode_cookies(&self.cookies)?,
            created_at: self.created_at,
            expires_in: self.expires_in.as_secs(),
            user: self.user.clone(),
        })
    }

    fn from_file(file: SessionFile) -> Result<Self> {
        Ok(Self {
            cookies: decode_cookies(&file.cookies)?,
            created_at: file.created_at,
            expires_in: Duration::from_secs(file.expires_in),
            user: file.user,
        })
    }
}

/// Read a session file.
///
/// Returns `Ok(None)` when the file does not exist and
/// `Err(S1Error::SessionExpired)` when it exists but has expired.
pub fn read_session(path: &Path) -> Result<Option<Session>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file: SessionFile = toml::from_str(&content)
        .map_err(|e| S1Error::Serialization(format!("session file: {e}")))?;
    let session = Session::from_file(file)?;
    if session.is_expired() {
        return Err(S1Error::SessionExpired);
    }
    Ok(Some(session))
}

/// Write a session file, creating parent directories as needed.
pub fn write_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = toml::to_string(&session.to_file()?)?;
    fs::write(path, content)?;
    Ok(())
}

/// Session state bound to its file on disk.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    expires_in: Duration,
    session: Option<Session>,
}

impl SessionStore {
    /// Open the session stored at `path`.
    ///
    /// An expired session file is deleted; an unreadable one is ignored.
    /// Either way the store starts logged out.
    pub fn open(path: impl Into<PathBuf>, expires_in: Duration) -> Self {
        let path = path.into();
        let session = match read_session(&path) {
            Ok(session) => session,
            Err(S1Error::SessionExpired) => {
                info!("Session at {} expired, clearing", path.display());
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to remove expired session file: {}", e);
                }
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                None
            }
        };
        Self {
            path,
            expires_in,
            session,
        }
    }

    /// A store that starts empty and never read from disk.
    pub fn empty(path: impl Into<PathBuf>, expires_in: Duration) -> Self {
        Self {
            path: path.into(),
            expires_in,
            session: None,
        }
    }

    /// Path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Saved cookies (empty when logged out).
    pub fn cookies(&self) -> CookieMap {
        self.session
            .as_ref()
            .map(|s| s.cookies.clone())
            .unwrap_or_default()
    }

    /// Replace the saved cookies and write the file.
    ///
    /// Saving refreshes the creation time, so the expiry slides forward
    /// with every exchange.
    pub fn save_cookies(&mut self, cookies: CookieMap) -> Result<()> {
        let expires_in = self.expires_in;
        let session = self
            .session
            .get_or_insert_with(|| Session::new(expires_in));
        session.cookies = cookies;
        session.created_at = Utc::now();
        session.expires_in = expires_in;
        debug!("Saving {} cookies to {}", session.cookies.len(), self.path.display());
        write_session(&self.path, session)
    }

    /// Record the logged-in user and write the file.
    pub fn set_user(&mut self, user: UserIdentity) -> Result<()> {
        let expires_in = self.expires_in;
        let session = self
            .session
            .get_or_insert_with(|| Session::new(expires_in));
        session.user = Some(user);
        write_session(&self.path, session)
    }

    /// Logged-in user, if any.
    pub fn user(&self) -> Option<&UserIdentity> {
        self.session.as_ref().and_then(|s| s.user.as_ref())
    }

    /// Whether both cookies and a user identity are present.
    pub fn is_logged_in(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.cookies.is_empty() && s.user.is_some())
    }

    /// Forget the session and delete its file.
    pub fn clear(&mut self) -> Result<()> {
        self.session = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
