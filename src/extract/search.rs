//! Search result extraction.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::numbers::parse_count;
use super::{attr, pattern, selector, text_of, topic_id_from_href, Fallbacks};
use crate::models::SearchResult;
use crate::Result;

/// Parses search pages.
#[derive(Debug, Clone)]
pub struct SearchParser {
    rows: Fallbacks,
    title: Fallbacks,
    author: Fallbacks,
    board: Fallbacks,
    counts: Selector,
    summary: Selector,
    summary_counts: Regex,
    results_link: Selector,
}

impl SearchParser {
    /// Create a parser.
    pub fn new() -> Result<Self> {
        Ok(Self {
            rows: Fallbacks::new(&["li.pbw", "tbody[id*='normalthread']"])?,
            title: Fallbacks::new(&["a.s.xst", "a.xst", "h3 a"])?,
            author: Fallbacks::new(&[
                "cite a",
                "a.xi2:not([href*='forum'])",
                "a[href*='uid']",
            ])?,
            board: Fallbacks::new(&[
                "a.xi2[href*='forum']",
                "em.xg1 a[href*='forum']",
                "a.xi1[href*='forum-']",
            ])?,
            counts: selector("td.num em")?,
            summary: selector("p.xg1")?,
            summary_counts: pattern(r"(\d+)\s*个回复\s*-\s*(\d+)\s*次查看")?,
            results_link: selector("a[href*='searchid=']")?,
        })
    }

    /// Link to the results page, when `doc` is an intermediate page.
    pub fn results_link(&self, doc: &Html) -> Option<String> {
        doc.select(&self.results_link)
            .find_map(|a| attr(a, "href"))
            .map(str::to_string)
    }

    /// Extract search results.
    pub fn parse(&self, doc: &Html) -> Vec<SearchResult> {
        let results: Vec<_> = self
            .rows
            .all(doc.root_element())
            .into_iter()
            .filter_map(|row| self.parse_row(row))
            .collect();
        debug!("Extracted {} search results", results.len());
        results
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Option<SearchResult> {
        let title_link = self.title.first(row)?;
        let title = text_of(title_link);
        let id = attr(title_link, "href").and_then(topic_id_from_href)?;
        if title.is_empty() {
            return None;
        }

        let author = self.author.text(row).unwrap_or_default();

        let board = self.board.text(row).unwrap_or_default();

        // replies come first here, unlike the topic list
        let counts: Vec<_> = row.select(&self.counts).map(text_of).collect();
        let (reply_count, view_count) = if counts.len() >= 2 {
            (parse_count(&counts[0]), parse_count(&counts[1]))
        } else {
            row.select(&self.summary)
                .find_map(|p| {
                    let text = text_of(p);
                    let caps = self.summary_counts.captures(&text)?;
                    Some((parse_count(&caps[1]), parse_count(&caps[2])))
                })
                .unwrap_or((0, 0))
        };

        Some(SearchResult {
            id,
            title,
            board,
            author,
            view_count,
            reply_count,
        })
    }
}
