//! Board list extraction.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::numbers::{parse_board_stats, parse_new_posts};
use super::{attr, child_elements, selector, text_of, Fallbacks};
use crate::models::Board;
use crate::Result;

/// Parses the forum index into boards.
///
/// Each row of the board table describes a top-level board, optionally
/// followed by links to its sub-boards. The first board link in the row
/// is the top-level board and receives the row's counts and description;
/// later links are sub-boards with zero counts. A row that lists a
/// sub-board before its parent is mis-attributed.
#[derive(Debug, Clone)]
pub struct BoardListParser {
    rows: Fallbacks,
    board_link: Selector,
    new_posts: Selector,
    description: Selector,
}

impl BoardListParser {
    /// Create a parser.
    pub fn new() -> Result<Self> {
        Ok(Self {
            rows: Fallbacks::new(&["table.fl_tb tr", "div.fl table tr"])?,
            board_link: selector("a[href*='forum-']")?,
            new_posts: selector("em")?,
            description: selector("p.xg2")?,
        })
    }

    /// Extract all boards from an index page.
    pub fn parse(&self, doc: &Html) -> Vec<Board> {
        let mut boards = Vec::new();
        for row in self.rows.all(doc.root_element()) {
            boards.extend(self.parse_row(row));
        }
        debug!("Extracted {} boards", boards.len());
        boards
    }

    fn parse_row(&self, row: ElementRef<'_>) -> Vec<Board> {
        let cells = child_elements(row, "td");
        if cells.len() < 3 {
            return Vec::new();
        }
        let info = cells[1];
        let (threads, posts) = parse_board_stats(&text_of(cells[2]));
        let new_posts = info
            .select(&self.new_posts)
            .next()
            .map(|em| parse_new_posts(&text_of(em)))
            .unwrap_or(0);
        let description = info
            .select(&self.description)
            .next()
            .map(text_of)
            .filter(|d| !d.is_empty());

        let mut boards = Vec::new();
        for link in info.select(&self.board_link) {
            let name = text_of(link);
            let url = attr(link, "href").unwrap_or_default();
            let id = board_id_from_href(url);
            if name.is_empty() || id.is_empty() {
                continue;
            }
            let top_level = boards.is_empty();
            boards.push(Board {
                id,
                name,
                description: if top_level { description.clone() } else { None },
                threads_count: if top_level { threads } else { 0 },
                posts_count: if top_level { posts } else { 0 },
                new_posts,
                url: url.to_string(),
            });
        }
        boards
    }
}

/// Board id from `forum-75-1.html`.
fn board_id_from_href(href: &str) -> String {
    href.split_once("forum-")
        .map(|(_, rest)| rest.split('-').next().unwrap_or_default().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<html><body>
    <table class="fl_tb">
      <tr>
        <td class="fl_icn"><img src="x.png"></td>
        <td>
          <h2><a href="forum-75-1.html">游戏论坛</a><em class="xw0 xi1" title="今日"> (123)</em></h2>
          <p class="xg2">游戏综合讨论</p>
          <p>子版块: <a href="forum-4-1.html">掌机</a>, <a href="forum-135-1.html">手游</a></p>
        </td>
        <td class="fl_i"><span class="xi2">20万</span><span class="xg1"> / 861万</span></td>
        <td class="fl_by">last</td>
      </tr>
      <tr>
        <td class="fl_icn"></td>
        <td><h2><a href="forum-51-1.html">动漫论坛</a></h2></td>
        <td class="fl_i">2599 / 151万</td>
      </tr>
      <tr><td colspan="3">separator</td></tr>
      <tr>
        <td></td>
        <td><h2><a href="forum.php?mod=forumdisplay">broken</a></h2></td>
        <td>1/2</td>
      </tr>
    </table>
    </body></html>"#;

    #[test]
    fn test_parse_index() {
        let doc = Html::parse_document(INDEX);
        let boards = BoardListParser::new().unwrap().parse(&doc);
        assert_eq!(boards.len(), 4);

        let game = &boards[0];
        assert_eq!(game.id, "75");
        assert_eq!(game.name, "游戏论坛");
        assert_eq!(game.description.as_deref(), Some("游戏综合讨论"));
        assert_eq!(game.threads_count, 200_000);
        assert_eq!(game.posts_count, 8_610_000);
        assert_eq!(game.new_posts, 123);
        assert_eq!(game.url, "forum-75-1.html");

        let handheld = &boards[1];
        assert_eq!(handheld.id, "4");
        assert_eq!(handheld.name, "掌机");
        assert_eq!(handheld.description, None);
        assert_eq!(handheld.threads_count, 0);
        assert_eq!(handheld.posts_count, 0);
        assert_eq!(boards[2].id, "135");

        let anime = &boards[3];
        assert_eq!(anime.id, "51");
        assert_eq!(anime.threads_count, 2599);
        assert_eq!(anime.posts_count, 1_510_000);
        assert_eq!(anime.new_posts, 0);
        assert_eq!(anime.description, None);
    }

    #[test]
    fn test_no_table_is_empty() {
        let doc = Html::parse_document("<html><body><p>maintenance</p></body></html>");
        assert!(BoardListParser::new().unwrap().parse(&doc).is_empty());
    }

    #[test]
    fn test_board_id_from_href() {
        assert_eq!(board_id_from_href("forum-75-1.html"), "75");
        assert_eq!(board_id_from_href("https://stage1st.com/2b/forum-6-2.html"), "6");
        assert_eq!(board_id_from_href("forum.php"), "");
    }
}
