//! Board model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A forum board (section) as listed on the forum index.
///
/// Sub-boards listed in the same row as a top-level board carry zero
/// aggregate counts and no description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Board ID as it appears in URLs (kept as a string).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description, only present for top-level boards.
    #[serde(default)]
    pub description: Option<String>,
    /// Number of topics.
    #[serde(default)]
    pub threads_count: u64,
    /// Number of posts.
    #[serde(default)]
    pub posts_count: u64,
    /// Number of posts new since the last visit.
    #[serde(default)]
    pub new_posts: u64,
    /// Board URL as linked from the index.
    #[serde(default)]
    pub url: String,
}

impl Board {
    /// Create a board with only an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            threads_count: 0,
            posts_count: 0,
            new_posts: 0,
            url: String::new(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (topics: {})", self.name, self.threads_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board() {
        let board = Board::new("4", "游戏论坛");
        assert_eq!(board.id, "4");
        assert_eq!(board.name, "游戏论坛");
        assert_eq!(board.description, None);
        assert_eq!(board.to_string(), "游戏论坛 (topics: 0)");
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let board: Board = serde_json::from_str(r#"{"id":"75","name":"外野"}"#).unwrap();
        assert_eq!(board.id, "75");
        assert_eq!(board.description, None);
        assert_eq!(board.posts_count, 0);
        assert!(board.url.is_empty());
    }
}
