//! Topic list extraction.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::numbers::parse_count;
use super::{attr, selector, text_of, topic_id_from_href, user_id_from_href, Fallbacks};
use crate::models::Topic;
use crate::Result;

/// Parses a board's topic list page.
#[derive(Debug, Clone)]
pub struct TopicListParser {
    blocks: Selector,
    title: Fallbacks,
    byline: Selector,
    cite: Selector,
    link: Selector,
    em: Selector,
    time: Fallbacks,
    reply_count: Fallbacks,
    view_count: Selector,
}

/// Block id prefixes for ordinary and pinned topics.
const BLOCK_PREFIXES: &[&str] = &["normalthread_", "stickthread_"];

impl TopicListParser {
    /// Create a parser.
    pub fn new() -> Result<Self> {
        Ok(Self {
            blocks: selector("tbody[id^='normalthread_'], tbody[id^='stickthread_']")?,
            title: Fallbacks::new(&["a.s.xst", "a.xst"])?,
            byline: selector("td.by")?,
            cite: selector("cite")?,
            link: selector("a")?,
            em: selector("em")?,
            time: Fallbacks::new(&["span", "a"])?,
            reply_count: Fallbacks::new(&["td.num a.xi2", "td.num a"])?,
            view_count: selector("td.num em")?,
        })
    }

    /// Extract the topics on a list page.
    ///
    /// `board` and `board_id` are copied onto every topic.
    pub fn parse(&self, doc: &Html, board: &str, board_id: &str) -> Vec<Topic> {
        let mut topics = Vec::new();
        for (index, block) in doc.select(&self.blocks).enumerate() {
            match self.parse_block(block) {
                Some(mut topic) => {
                    topic.board = Some(board.to_string());
                    topic.board_id = Some(board_id.to_string());
                    topics.push(topic);
                }
                None => warn!("Skipping unparseable topic block {}", index),
            }
        }
        debug!("Extracted {} topics for board {}", topics.len(), board_id);
        topics
    }

    fn parse_block(&self, block: ElementRef<'_>) -> Option<Topic> {
        let title_link = self.title.first(block)?;
        let title = text_of(title_link);
        let href = attr(title_link, "href").unwrap_or_default();

        let block_id = block.value().id().unwrap_or_default();
        let id = BLOCK_PREFIXES
            .iter()
            .find_map(|prefix| block_id.strip_prefix(prefix))
            .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .or_else(|| topic_id_from_href(href))?;
        if title.is_empty() {
            return None;
        }

        let mut topic = Topic::new(id, title);

        let bylines: Vec<_> = block.select(&self.byline).collect();
        if let Some(first) = bylines.first() {
            let (author, author_id) = self.byline_author(*first);
            topic.author = author.unwrap_or_default();
            topic.author_id = author_id;
            topic.created_at = self.byline_time(*first);
        }
        if let Some(last) = bylines.get(1) {
            topic.last_reply_author = self.byline_author(*last).0;
            topic.last_reply_time = self.byline_time(*last);
        }

        topic.reply_count = self
            .reply_count
            .text(block)
            .map(|t| parse_count(&t))
            .unwrap_or(0);
        topic.view_count = block
            .select(&self.view_count)
            .next()
            .map(|em| parse_count(&text_of(em)))
            .unwrap_or(0);

        let markup = block.html();
        let lower = markup.to_lowercase();
        topic.pinned = block_id.starts_with("stickthread_")
            || markup.contains("icn stk")
            || block.value().classes().any(|c| c == "sortnum");
        topic.highlighted = markup.contains("icn dgt") || lower.contains("digest");
        topic.locked = lower.contains("folder_lock") || markup.contains("icn lck");

        Some(topic)
    }

    fn byline_author(&self, byline: ElementRef<'_>) -> (Option<String>, Option<String>) {
        let Some(cite) = byline.select(&self.cite).next() else {
            return (None, None);
        };
        match cite.select(&self.link).next() {
            Some(a) => (
                Some(text_of(a)),
                attr(a, "href").and_then(user_id_from_href),
            ),
            None => (Some(text_of(cite)), None),
        }
    }

    fn byline_time(&self, byline: ElementRef<'_>) -> Option<String> {
        let em = byline.select(&self.em).next()?;
        let text = self.time.text(em).unwrap_or_else(|| text_of(em));
        (!text.is_empty()).then_some(text)
    }
}
