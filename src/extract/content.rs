//! Post body sanitization.
//!
//! A post body is reduced to plain text: quoted posts and signatures are
//! dropped, absolute links are replaced by their target, text fragments
//! are joined with line breaks, and every bare URL is rewritten into a
//! `[link=URL]【跳转至host】[/link]` marker.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use scraper::{ElementRef, Node};
use url::Url;

use super::{attr, selector};
use crate::Result;

/// Marker text, or a bare URL ending at whitespace, a zero-width space or `]`.
const LINK_PATTERN: &str =
    r"(\[link=[^\]]+\]【跳转至[^】]*】\[/link\])|(https?://[^\s\x{200B}\]]+)";

fn link_regex() -> Option<&'static Regex> {
    static LINK: OnceLock<Option<Regex>> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(LINK_PATTERN).ok()).as_ref()
}

/// Rewrite bare URLs in `text` into jump markers.
///
/// Existing markers are left alone, so the rewrite is idempotent.
pub fn rewrite_links(text: &str) -> String {
    let Some(re) = link_regex() else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &Captures<'_>| {
        if let Some(marker) = caps.get(1) {
            return marker.as_str().to_string();
        }
        let raw = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        match Url::parse(raw).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(host) => {
                let host = host.strip_prefix("www.").unwrap_or(&host);
                format!("[link={raw}]【跳转至{host}】[/link]")
            }
            None => raw.to_string(),
        }
    })
    .into_owned()
}

/// Turns a post's message element into display text.
#[derive(Debug, Clone)]
pub struct ContentSanitizer {
    quote_link: scraper::Selector,
}

impl ContentSanitizer {
    /// Create a sanitizer.
    pub fn new() -> Result<Self> {
        Ok(Self {
            quote_link: selector("div.quote a[href*='pid=']")?,
        })
    }

    /// Plain text of `message` with quotes and signatures removed.
    pub fn sanitize(&self, message: ElementRef<'_>) -> String {
        let mut fragments = Vec::new();
        collect_text(message, &mut fragments);
        rewrite_links(&fragments.join("\n"))
    }

    /// Id of the post quoted inside `message`, if any.
    pub fn quoted_post_id(&self, message: ElementRef<'_>) -> Option<String> {
        let href = message.select(&self.quote_link).find_map(|a| attr(a, "href"))?;
        let (_, rest) = href.split_once("pid=")?;
        let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        (!id.is_empty()).then_some(id)
    }
}

fn is_noise(element: ElementRef<'_>) -> bool {
    let el = element.value();
    match el.name() {
        "script" | "style" => true,
        "div" => {
            el.classes().any(|c| c == "quote") || el.id().is_some_and(|id| id.contains("sign_"))
        }
        _ => false,
    }
}

fn absolute_href(element: ElementRef<'_>) -> Option<&str> {
    if element.value().name() != "a" {
        return None;
    }
    attr(element, "href").filter(|h| h.starts_with("http://") || h.starts_with("https://"))
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push(text.to_string());
                }
            }
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_noise(child) {
                    continue;
                }
                if let Some(href) = absolute_href(child) {
                    out.push(href.to_string());
                    continue;
                }
                collect_text(child, out);
            }
            _ => {}
        }
    }
}
