//! HTML extraction.
//!
//! Each page type has a parser that turns one document into domain records.
//! Parsers are pure: they take a parsed [`Html`] and never touch the network,
//! so they can be tested against fixture markup.
//!
//! Extraction is best-effort. Every field is looked up through an ordered
//! list of selectors ([`Fallbacks`]); a field that cannot be found takes its
//! zero value, and a record that cannot be built is skipped. Only a parser
//! whose selectors fail to compile returns an error.

mod board;
mod content;
mod numbers;
mod search;
mod tokens;
mod topic;
mod topic_list;

pub use board::BoardListParser;
pub use content::{rewrite_links, ContentSanitizer};
pub use numbers::{
    parse_board_stats, parse_count, parse_floor_label, parse_new_posts, strip_posted_at,
};
pub use search::SearchParser;
pub use tokens::{
    ajax_payload, classify_check_in, error_message, extract_rewards, find_check_in_token,
    find_current_user, find_formhash, find_loginhash, has_logout_link, visible_text, CheckInOutcome,
};
pub use topic::TopicParser;
pub use topic_list::TopicListParser;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::{Result, S1Error};

/// Compile a CSS selector.
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| S1Error::Parse(format!("invalid selector '{css}': {e}")))
}

/// Compile a regular expression.
pub(crate) fn pattern(re: &str) -> Result<Regex> {
    Regex::new(re).map_err(|e| S1Error::Parse(format!("invalid pattern '{re}': {e}")))
}

/// Ordered alternative selectors for one field.
///
/// Lookups try each selector in turn and use the first that matches.
#[derive(Debug, Clone)]
pub struct Fallbacks {
    selectors: Vec<Selector>,
}

impl Fallbacks {
    /// Compile the candidates, most specific first.
    pub fn new(candidates: &[&str]) -> Result<Self> {
        let selectors = candidates
            .iter()
            .map(|css| selector(css))
            .collect::<Result<Vec<_>>>()?;
        if selectors.is_empty() {
            return Err(S1Error::Parse("no selectors given".to_string()));
        }
        Ok(Self { selectors })
    }

    /// First element matched by the first selector that matches anything.
    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.selectors
            .iter()
            .find_map(|selector| scope.select(selector).next())
    }

    /// All elements matched by the first selector that matches anything.
    pub fn all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        for selector in &self.selectors {
            let found: Vec<_> = scope.select(selector).collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Trimmed text of [`Fallbacks::first`], if any.
    pub fn text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.first(scope).map(text_of)
    }
}

/// Concatenated text of an element with surrounding whitespace trimmed.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Direct element children with tag `name`.
pub(crate) fn child_elements<'a>(element: ElementRef<'a>, name: &str) -> Vec<ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == name)
        .collect()
}

/// Attribute value, if present and non-empty.
pub(crate) fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name).filter(|v| !v.is_empty())
}

/// First capture group of `re` in `text`.
pub(crate) fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Topic id from a topic link.
///
/// Accepts the query form (`viewthread&tid=123`) and the path form
/// (`thread-123-1-1.html`).
pub(crate) fn topic_id_from_href(href: &str) -> Option<String> {
    if let Some((_, rest)) = href.split_once("tid=") {
        let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !id.is_empty() {
            return Some(id);
        }
    }
    if let Some((_, rest)) = href.split_once("thread-") {
        let id = rest.split('-').next().unwrap_or_default();
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            return Some(id.to_string());
        }
    }
    None
}

/// User id from a profile link (`space-uid-42.html` or `uid=42`).
pub(crate) fn user_id_from_href(href: &str) -> Option<String> {
    ["uid-", "uid="].iter().find_map(|marker| {
        let (_, rest) = href.split_once(marker)?;
        let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        (!id.is_empty()).then_some(id)
    })
}
