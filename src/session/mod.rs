//! Session persistence.
//!
//! This module provides:
//! - The cookie blob codec used by the session file
//! - The persisted session with expiry and user identity
//! - The on-disk board-list cache

mod cache;
mod cookies;
mod store;

pub use cache::BoardCache;
pub use cookies::{decode_cookies, encode_cookies, parse_cookie_header, CookieMap};
pub use store::{read_session, write_session, Session, SessionStore, DEFAULT_SESSION_EXPIRES_SECS};
