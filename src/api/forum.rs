//! Board list and topic lists.

use tracing::{debug, info, warn};

use super::fetch;
use crate::config::Config;
use crate::extract::{BoardListParser, TopicListParser};
use crate::models::{Board, Topic};
use crate::retry::RetryPolicy;
use crate::session::BoardCache;
use crate::transport::{RequestSpec, Transport};
use crate::{Result, S1Error};

/// Forum index listing every board.
const INDEX_PAGE: &str = "forum.php?gid=1";

/// Board operations.
#[derive(Debug, Clone)]
pub struct ForumApi<'a> {
    transport: &'a Transport,
    retry: RetryPolicy,
    cache: Option<BoardCache>,
    boards: BoardListParser,
    topics: TopicListParser,
}

impl<'a> ForumApi<'a> {
    /// Create with the default retry policy and no board cache.
    pub fn new(transport: &'a Transport) -> Result<Self> {
        Ok(Self {
            transport,
            retry: RetryPolicy::default(),
            cache: None,
            boards: BoardListParser::new()?,
            topics: TopicListParser::new()?,
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

    /// Use `cache` for board names.
    pub fn with_cache(mut self, cache: Option<BoardCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Fetch every board, refreshing the board cache.
    pub async fn board_list(&self) -> Result<Vec<Board>> {
        let page = fetch(
            self.transport,
            &self.retry,
            "fetch board list",
            RequestSpec::get(INDEX_PAGE),
        )
        .await?;
        let boards = self.boards.parse(&page.document());
        info!("Fetched {} boards", boards.len());

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(&boards) {
                warn!("Failed to update board cache: {}", e);
            }
        }
        Ok(boards)
    }

    /// Board id for a board id or display name.
    ///
    /// Names are looked up in the cache first, then in a freshly fetched
    /// board list. An unknown name is a validation error.
    pub async fn resolve_board_id(&self, board: &str) -> Result<String> {
        let board = board.trim();
        if board.is_empty() {
            return Err(S1Error::Validation("board must not be empty".to_string()));
        }
        if board.chars().all(|c| c.is_ascii_digit()) {
            return Ok(board.to_string());
        }
        if let Some(id) = self.cache.as_ref().and_then(|c| c.resolve_id(board)) {
            debug!("Board {} resolved from cache to {}", board, id);
            return Ok(id);
        }
        self.board_list()
            .await?
            .into_iter()
            .find(|b| b.name == board)
            .map(|b| b.id)
            .ok_or_else(|| S1Error::Validation(format!("unknown board: {board}")))
    }

    /// Display name for a board argument, falling back to the argument.
    fn board_name(&self, board: &str, id: &str) -> String {
        if board != id {
            return board.to_string();
        }
        self.cache
            .as_ref()
            .and_then(|c| c.resolve_name(id))
            .unwrap_or_else(|| board.to_string())
    }

    /// Topics on page `page` of `board` (an id or a display name).
    ///
    /// Pages below 1 are treated as 1. A page with no topics is an empty
    /// list.
    pub async fn topic_list(&self, board: &str, page: u32) -> Result<Vec<Topic>> {
        let page = page.max(1);
        let board = board.trim();
        let board_id = self.resolve_board_id(board).await?;
        let name = self.board_name(board, &board_id);

        let fetched = fetch(
            self.transport,
            &self.retry,
            "fetch topic list",
            RequestSpec::get("forum.php")
                .query("mod", "forumdisplay")
                .query("fid", board_id.as_str())
                .query("page", page.to_string()),
        )
        .await?;
        let topics = self.topics.parse(&fetched.document(), &name, &board_id);
        info!("Fetched {} topics from {} page {}", topics.len(), name, page);
        Ok(topics)
    }
}
