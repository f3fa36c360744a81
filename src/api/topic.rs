//! Topic pages, new topics and replies.

use scraper::Html;
use tracing::{debug, info, warn};

use super::{fetch, unix_time, validate_body, validate_id, validate_title, ForumApi};
use crate::config::Config;
use crate::extract::{error_message, find_formhash, selector, topic_id_from_href, TopicParser};
use crate::models::TopicPage;
use crate::retry::RetryPolicy;
use crate::session::BoardCache;
use crate::transport::{FetchedPage, RequestSpec, Transport};
use crate::{Result, S1Error};

/// Hidden fields the reply form fills in when quoting a post.
const NOTICE_FIELDS: &[&str] = &["noticeauthor", "noticetrimstr", "noticeauthormsg"];

/// Topic operations.
#[derive(Debug, Clone)]
pub struct TopicApi<'a> {
    transport: &'a Transport,
    retry: RetryPolicy,
    parser: TopicParser,
    forum: ForumApi<'a>,
}

/// Tokens read from a compose page.
#[derive(Debug, Default, PartialEq, Eq)]
struct ComposeForm {
    formhash: Option<String>,
    notice: Vec<(String, String)>,
}

impl ComposeForm {
    fn from_body(body: &str) -> Result<Self> {
        let doc = Html::parse_document(body);
        let hidden = selector("input[type='hidden']")?;
        let notice = NOTICE_FIELDS
            .iter()
            .map(|name| {
                let value = doc
                    .select(&hidden)
                    .find(|input| input.value().attr("name") == Some(*name))
                    .and_then(|input| input.value().attr("value"))
                    .unwrap_or_default();
                (name.to_string(), value.to_string())
            })
            .collect();
        Ok(Self {
            formhash: find_formhash(&doc),
            notice,
        })
    }

    fn require_formhash(&mut self, page: &str) -> Result<String> {
        self.formhash.take().ok_or_else(|| {
            S1Error::Authentication(format!("formhash not found on {page}; not logged in?"))
        })
    }
}

impl<'a> TopicApi<'a> {
    /// Create with the default retry policy and no board cache.
    pub fn new(transport: &'a Transport) -> Result<Self> {
        Ok(Self {
            transport,
            retry: RetryPolicy::default(),
            parser: TopicParser::new()?,
            forum: ForumApi::new(transport)?,
        })
    }

    /// Create with the retry policy and board cache from `config`.
    pub fn from_config(transport: &'a Transport, config: &Config) -> Result<Self> {
        Ok(Self {
            transport,
            retry: RetryPolicy::from_config(&config.retry),
            parser: TopicParser::new()?,
            forum: ForumApi::from_config(transport, config)?,
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self.forum = self.forum.with_retry(retry);
        self
    }

    /// Use `cache` to resolve board names when creating topics.
    pub fn with_cache(mut self, cache: Option<BoardCache>) -> Self {
        self.forum = self.forum.with_cache(cache);
        self
    }

    /// Fetch page `page` of topic `topic_id`.
    ///
    /// Pages below 1 are treated as 1. A page past the end yields the last
    /// page, reported through [`TopicPage::actual_page`].
    pub async fn topic(&self, topic_id: &str, page: u32) -> Result<TopicPage> {
        let topic_id = topic_id.trim();
        validate_id("topic", topic_id)?;
        let page = page.max(1);

        let fetched = fetch(
            self.transport,
            &self.retry,
            "fetch topic",
            RequestSpec::get(format!("thread-{topic_id}-{page}-1.html")),
        )
        .await?;
        let topic = self.parser.parse(&fetched.document(), topic_id, page);

        if topic.title.is_empty() && topic.content.is_empty() && topic.replies.is_empty() {
            if let Some(message) = error_message(&fetched.body) {
                return Err(S1Error::Api(message));
            }
        }
        let result = TopicPage {
            requested_page: page,
            topic,
        };
        if result.was_clamped() {
            debug!(
                "Topic {} page {} served as page {}",
                topic_id,
                page,
                result.actual_page()
            );
        }
        Ok(result)
    }

    /// Post a new topic to `board` (an id or a display name) and return
    /// its id.
    pub async fn create_topic(&self, board: &str, title: &str, body: &str) -> Result<String> {
        validate_title(title)?;
        validate_body(body)?;
        let fid = self.forum.resolve_board_id(board).await?;

        let compose = fetch(
            self.transport,
            &self.retry,
            "load new topic form",
            RequestSpec::get(format!("forum.php?mod=post&action=newthread&fid={fid}")),
        )
        .await?;
        let formhash = ComposeForm::from_body(&compose.body)?.require_formhash("new topic form")?;

        let spec = RequestSpec::post(format!(
            "forum.php?mod=post&action=newthread&fid={fid}&extra=&topicsubmit=yes"
        ))
        .form(vec![
            ("formhash", formhash),
            ("posttime", unix_time()),
            ("wysiwyg", "1".to_string()),
            ("subject", title.to_string()),
            ("message", body.to_string()),
            ("topicsubmit", "yes".to_string()),
            ("save", String::new()),
        ]);
        let response = fetch(self.transport, &self.retry, "submit new topic", spec).await?;

        let id = submitted_id(&response, topic_id_from_href, "topic")?;
        info!("Created topic {} in board {}", id, fid);
        Ok(id)
    }

    /// Reply to topic `topic_id`, optionally quoting post `quote`, and
    /// return the new post's id.
    pub async fn reply(&self, topic_id: &str, body: &str, quote: Option<&str>) -> Result<String> {
        let topic_id = topic_id.trim();
        validate_id("topic", topic_id)?;
        validate_body(body)?;
        let quote = quote.map(str::trim).filter(|q| !q.is_empty());
        if let Some(pid) = quote {
            validate_id("post", pid)?;
        }

        let mut compose_path = format!("forum.php?mod=post&action=reply&tid={topic_id}");
        if let Some(pid) = quote {
            compose_path.push_str(&format!("&repquote={pid}"));
        }
        let compose = fetch(
            self.transport,
            &self.retry,
            "load reply form",
            RequestSpec::get(compose_path),
        )
        .await?;
        let mut form = ComposeForm::from_body(&compose.body)?;
        let formhash = form.require_formhash("reply form")?;

        let mut fields = vec![
            ("formhash".to_string(), formhash),
            ("posttime".to_string(), unix_time()),
            ("wysiwyg".to_string(), "1".to_string()),
            ("message".to_string(), body.to_string()),
            ("replysubmit".to_string(), "yes".to_string()),
            ("save".to_string(), String::new()),
        ];
        if let Some(pid) = quote {
            fields.extend(form.notice);
            fields.push(("reppid".to_string(), pid.to_string()));
            fields.push(("reppost".to_string(), pid.to_string()));
        }

        let spec = RequestSpec::post(format!(
            "forum.php?mod=post&action=reply&tid={topic_id}&replysubmit=yes"
        ))
        .form(fields);
        let response = fetch(self.transport, &self.retry, "submit reply", spec).await?;

        let id = submitted_id(&response, post_id_from, "reply")?;
        info!("Replied to topic {} with post {}", topic_id, id);
        Ok(id)
    }
}

/// Post id from a link or URL (`pid=N` or `#pidN`).
fn post_id_from(text: &str) -> Option<String> {
    ["pid=", "#pid"].iter().find_map(|marker| {
        text.match_indices(marker).find_map(|(at, _)| {
            // skip "ptid=" and "reppid=" style parameters
            let before = text[..at].chars().next_back();
            if *marker == "pid=" && matches!(before, Some(c) if c.is_ascii_alphanumeric()) {
                return None;
            }
            let id: String = text[at + marker.len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            (!id.is_empty()).then_some(id)
        })
    })
}

/// Id of the record a submission created.
///
/// Looked for in the final URL, then in the body; a recognizable error
/// message takes precedence over ids scattered through the body.
fn submitted_id(
    response: &FetchedPage,
    find: fn(&str) -> Option<String>,
    kind: &str,
) -> Result<String> {
    if let Some(id) = find(response.url.as_str()) {
        return Ok(id);
    }
    if let Some(message) = error_message(&response.body) {
        warn!("Submitting {} was rejected: {}", kind, message);
        return Err(S1Error::Api(message));
    }
    find(&response.body).ok_or_else(|| S1Error::Api(format!("no {kind} id in response")))
}
