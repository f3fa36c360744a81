//! Configuration module for the Stage1st client.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, S1Error};

/// Default desktop browser user agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Total request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Requests closer together than this are delayed.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    /// Upper bound of the random delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_base_url() -> String {
    "https://stage1st.com/2b".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_min_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    2000
}

fn default_max_redirects() -> usize {
    10
}

impl ClientConfig {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the session file and caches.
    #[serde(default = "default_session_dir")]
    pub dir: String,
    /// Session file name inside `dir`.
    #[serde(default = "default_session_file")]
    pub session_file: String,
    /// Session lifetime in seconds.
    #[serde(default = "default_expires_in")]
    pub expires_in_secs: u64,
}

fn default_session_dir() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("s1cli")
        .to_string_lossy()
        .into_owned()
}

fn default_session_file() -> String {
    "session.toml".to_string()
}

fn default_expires_in() -> u64 {
    7 * 24 * 3600
}

impl SessionConfig {
    /// Full path of the session file.
    pub fn session_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.session_file)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
            session_file: default_session_file(),
            expires_in_secs: default_expires_in(),
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after each retry.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay(),
            multiplier: default_multiplier(),
        }
    }
}

/// Board-list cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Whether fetched board lists are written to disk.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache file path, relative to the session directory.
    #[serde(default = "default_board_list_file")]
    pub board_list_file: String,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_board_list_file() -> String {
    "cache/forums.json".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            board_list_file: default_board_list_file(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/s1client.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP client configuration.
    #[serde(default)]
    pub client: ClientConfig,
    /// Session persistence.
    #[serde(default)]
    pub session: SessionConfig,
    /// Retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Board-list cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(S1Error::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| S1Error::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `S1_BASE_URL`: Override the forum base URL
    /// - `S1_SESSION_DIR`: Override the session directory
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("S1_BASE_URL") {
            if !base_url.is_empty() {
                self.client.base_url = base_url;
            }
        }
        if let Ok(dir) = std::env::var("S1_SESSION_DIR") {
            if !dir.is_empty() {
                self.session.dir = dir;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        match url::Url::parse(&self.client.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(S1Error::Config(format!(
                    "base_url must be an absolute http(s) URL: {}",
                    self.client.base_url
                )));
            }
        }
        if self.client.min_delay_ms > self.client.max_delay_ms {
            return Err(S1Error::Config(
                "client.min_delay_ms must not exceed client.max_delay_ms".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(S1Error::Config(
                "retry.multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Full path of the board-list cache file.
    pub fn board_cache_path(&self) -> PathBuf {
        Path::new(&self.session.dir).join(&self.cache.board_list_file)
    }
}
