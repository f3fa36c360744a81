//! s1client - Stage1st forum client
//!
//! An HTTP client for a Discuz-based discussion forum: browser-like
//! transport with request spacing and persisted cookies, login and daily
//! check-in, and HTML extraction of boards, topics, replies and search
//! results.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod rate_limit;
pub mod retry;
pub mod session;
pub mod transport;

pub use api::{AuthApi, ForumApi, SearchApi, TopicApi, MAX_BODY_LENGTH, MAX_TITLE_LENGTH};
pub use config::Config;
pub use error::{Result, S1Error};
pub use models::{Board, CheckIn, Reply, Reward, SearchResult, Topic, TopicPage, UserIdentity};
pub use retry::{FallbackPolicy, RetryPolicy};
pub use session::{BoardCache, SessionStore};
pub use transport::{FetchedPage, RequestSpec, Transport};
