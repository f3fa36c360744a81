//! Keyword search.

use tracing::{debug, info};

use super::fetch;
use crate::config::Config;
use crate::extract::SearchParser;
use crate::models::SearchResult;
use crate::retry::RetryPolicy;
use crate::session::BoardCache;
use crate::transport::{RequestSpec, Transport};
use crate::{Result, S1Error};

/// Search operations.
#[derive(Debug, Clone)]
pub struct SearchApi<'a> {
    transport: &'a Transport,
    retry: RetryPolicy,
    cache: Option<BoardCache>,
    parser: SearchParser,
}

impl<'a> SearchApi<'a> {
    /// Create with the default retry policy and no board cache.
    pub fn new(transport: &'a Transport) -> Result<Self> {
        Ok(Self {
            transport,
            retry: RetryPolicy::default(),
            cache: None,
            parser: SearchParser::new()?,
        })
    }

    /// Create with the retry policy and board cache from `config`.
    pub fn from_config(transport: &'a Transport, config: &Config) -> Result<Self> {
        let cache = config
            .cache
            .enabled
            .then(|| BoardCache::new(config.board_cache_path()));
        Ok(Self::new(transport)?
            .with_retry(RetryPolicy::from_config(&config.retry))
            .with_cache(cache))
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use `cache` to turn board names into ids.
    pub fn with_cache(mut self, cache: Option<BoardCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Search topics for `keyword`, optionally within `board`.
    ///
    /// No matches is an empty list.
    pub async fn search(&self, keyword: &str, board: Option<&str>) -> Result<Vec<SearchResult>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(S1Error::Validation("keyword must not be empty".to_string()));
        }

        let mut spec = RequestSpec::get("search.php")
            .query("mod", "forum")
            .query("srchtxt", keyword)
            .query("searchsubmit", "yes")
            .query("source", "hotsearch");
        if let Some(board) = board.map(str::trim).filter(|b| !b.is_empty()) {
            spec = match self.board_filter(board) {
                Some(fid) => spec.query("srchfid[]", fid),
                None => spec.query("forum", board),
            };
        }

        let page = fetch(self.transport, &self.retry, "search", spec).await?;
        let results = self.parser.parse(&page.document());
        if !results.is_empty() || page.url.as_str().contains("searchid=") {
            info!("Search for '{}' found {} results", keyword, results.len());
            return Ok(results);
        }

        let Some(link) = self.parser.results_link(&page.document()) else {
            debug!("Search for '{}' returned no results page", keyword);
            return Ok(Vec::new());
        };
        debug!("Following search results link {}", link);
        let page = fetch(
            self.transport,
            &self.retry,
            "fetch search results",
            RequestSpec::get(link),
        )
        .await?;
        let results = self.parser.parse(&page.document());
        info!("Search for '{}' found {} results", keyword, results.len());
        Ok(results)
    }

    /// Board id to filter by: numeric arguments as-is, names via the cache.
    fn board_filter(&self, board: &str) -> Option<String> {
        if board.chars().all(|c| c.is_ascii_digit()) {
            return Some(board.to_string());
        }
        self.cache.as_ref().and_then(|c| c.resolve_id(board))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::models::Board;
    use crate::session::SessionStore;
    use std::time::Duration;
    use tempfile::TempDir;

    fn transport(dir: &TempDir) -> Transport {
        let store = SessionStore::empty(dir.path().join("session.toml"), Duration::from_secs(60));
        Transport::new(&ClientConfig::default(), store).unwrap()
    }

    #[tokio::test]
    async fn test_empty_keyword_rejected_without_request() {
        let dir = TempDir::new().unwrap();
        let transport = transport(&dir);
        let api = SearchApi::new(&transport).unwrap();
        assert!(matches!(
            api.search("   ", None).await,
            Err(S1Error::Validation(_))
        ));
        assert!(transport.last_request().is_none());
    }

    #[test]
    fn test_board_filter() {
        let dir = TempDir::new().unwrap();
        let transport = transport(&dir);
        let cache = BoardCache::new(dir.path().join("forums.json"));
        cache.save(&[Board::new("75", "游戏论坛")]).unwrap();
        let api = SearchApi::new(&transport).unwrap().with_cache(Some(cache));

        assert_eq!(api.board_filter("6").as_deref(), Some("6"));
        assert_eq!(api.board_filter("游戏论坛").as_deref(), Some("75"));
        assert_eq!(api.board_filter("外野"), None);
    }
}
