//! Topic page extraction: the opening post, its replies and pagination.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::content::ContentSanitizer;
use super::numbers::{parse_count, parse_floor_label, strip_posted_at};
use super::{attr, capture, pattern, selector, text_of, user_id_from_href, Fallbacks};
use crate::models::{Reply, Topic};
use crate::Result;

/// One post block on a topic page, before it is split into the opening
/// post and the replies.
#[derive(Debug)]
struct PostBlock<'a> {
    id: String,
    floor: u32,
    element: ElementRef<'a>,
}

/// Parses a topic page.
#[derive(Debug, Clone)]
pub struct TopicParser {
    title: Fallbacks,
    stats: Selector,
    page_hint: Selector,
    current_page: Selector,
    total_pages: Regex,
    posts: Selector,
    floor: Selector,
    floor_label: Selector,
    author: Fallbacks,
    posted_at: Selector,
    message: Selector,
    sanitizer: ContentSanitizer,
}

impl TopicParser {
    /// Create a parser.
    pub fn new() -> Result<Self> {
        Ok(Self {
            title: Fallbacks::new(&["span#thread_subject", "h1.ts"])?,
            stats: selector("div.hm.ptn span.xi1")?,
            page_hint: selector("span[title]")?,
            current_page: selector("div.pg strong")?,
            total_pages: pattern(r"共\s*(\d+)\s*页")?,
            posts: selector("div[id^='post_']")?,
            floor: selector("a[id^='postnum']")?,
            floor_label: selector("em")?,
            author: Fallbacks::new(&["div.authi a.xw1", "a.xw1"])?,
            posted_at: selector("em[id^='authorposton']")?,
            message: selector("td[id^='postmessage_']")?,
            sanitizer: ContentSanitizer::new()?,
        })
    }

    /// Extract the topic on page `requested_page` of topic `topic_id`.
    ///
    /// The reported `current_page` is the page the forum actually served,
    /// which is the last page when `requested_page` is past the end.
    pub fn parse(&self, doc: &Html, topic_id: &str, requested_page: u32) -> Topic {
        let root = doc.root_element();
        let title = self.title.text(root).unwrap_or_default();
        let mut topic = Topic::new(topic_id, title);

        let stats: Vec<_> = root.select(&self.stats).map(text_of).collect();
        if stats.len() >= 2 {
            topic.view_count = parse_count(&stats[0]);
            topic.reply_count = parse_count(&stats[1]);
        }

        topic.total_pages = self.total_pages(root);
        topic.current_page = self
            .current_page(root)
            .unwrap_or_else(|| requested_page.clamp(1, topic.total_pages));

        let blocks = self.post_blocks(root);
        let opening = blocks
            .iter()
            .find(|b| b.floor == 1)
            .or_else(|| blocks.first().filter(|_| topic.current_page == 1));
        if let Some(op) = opening {
            topic.author = self.author(op.element).unwrap_or_default();
            topic.author_id = self.author_id(op.element);
            topic.created_at = self.posted_at(op.element);
            topic.content = self.content(op.element);
        }
        let opening_id = opening.map(|b| b.id.clone());

        topic.replies = blocks
            .iter()
            .filter(|b| b.floor != 1 && Some(&b.id) != opening_id.as_ref())
            .map(|b| self.reply(b, topic_id))
            .collect();

        debug!(
            "Topic {} page {}/{}: {} replies",
            topic_id,
            topic.current_page,
            topic.total_pages,
            topic.replies.len()
        );
        topic
    }

    fn total_pages(&self, root: ElementRef<'_>) -> u32 {
        root.select(&self.page_hint)
            .filter_map(|span| attr(span, "title"))
            .find_map(|title| capture(&self.total_pages, title))
            .and_then(|n| n.parse().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1)
    }

    fn current_page(&self, root: ElementRef<'_>) -> Option<u32> {
        let strong = root.select(&self.current_page).next()?;
        text_of(strong).parse().ok().filter(|n| *n >= 1)
    }

    fn post_blocks<'a>(&self, root: ElementRef<'a>) -> Vec<PostBlock<'a>> {
        let mut blocks = Vec::new();
        for element in root.select(&self.posts) {
            let Some(id) = element
                .value()
                .id()
                .and_then(|id| id.strip_prefix("post_"))
                .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
            else {
                continue;
            };
            let floor = element
                .select(&self.floor)
                .next()
                .map(|a| {
                    let label = a
                        .select(&self.floor_label)
                        .next()
                        .map(text_of)
                        .unwrap_or_else(|| text_of(a));
                    parse_floor_label(&label)
                })
                .unwrap_or(0);
            blocks.push(PostBlock {
                id: id.to_string(),
                floor,
                element,
            });
        }
        blocks
    }

    fn reply(&self, block: &PostBlock<'_>, topic_id: &str) -> Reply {
        let message = block.element.select(&self.message).next();
        if message.is_none() {
            warn!("Post {} has no message body", block.id);
        }
        Reply {
            id: block.id.clone(),
            topic_id: topic_id.to_string(),
            floor: block.floor,
            author: self.author(block.element).unwrap_or_default(),
            author_id: self.author_id(block.element),
            content: message
                .map(|m| self.sanitizer.sanitize(m))
                .unwrap_or_default(),
            posted_at: self.posted_at(block.element),
            quote_reply_id: message.and_then(|m| self.sanitizer.quoted_post_id(m)),
        }
    }

    fn author(&self, post: ElementRef<'_>) -> Option<String> {
        self.author.text(post).filter(|a| !a.is_empty())
    }

    fn author_id(&self, post: ElementRef<'_>) -> Option<String> {
        self.author
            .first(post)
            .and_then(|a| attr(a, "href"))
            .and_then(user_id_from_href)
    }

    fn posted_at(&self, post: ElementRef<'_>) -> Option<String> {
        let em = post.select(&self.posted_at).next()?;
        let text = strip_posted_at(&text_of(em));
        (!text.is_empty()).then_some(text)
    }

    fn content(&self, post: ElementRef<'_>) -> String {
        post.select(&self.message)
            .next()
            .map(|m| self.sanitizer.sanitize(m))
            .unwrap_or_default()
    }
}
