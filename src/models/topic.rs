//! Topic model.

use std::fmt;

use super::Reply;

/// A discussion thread: one opening post plus its replies.
///
/// List pages fill in the listing fields (board, last reply, flags);
/// topic pages fill in the body, the replies and the page numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topic {
    /// Topic ID.
    pub id: String,
    /// Title.
    pub title: String,
    /// Author display name; empty when the byline was missing.
    pub author: String,
    /// Author user ID, when linked.
    pub author_id: Option<String>,
    /// Owning board name (or the name/id the caller asked for).
    pub board: Option<String>,
    /// Owning board ID.
    pub board_id: Option<String>,
    /// Sanitized plain-text body of the opening post.
    pub content: String,
    /// Number of views.
    pub view_count: u64,
    /// Number of replies.
    pub reply_count: u64,
    /// Display timestamp of the opening post.
    pub created_at: Option<String>,
    /// Last replier's display name.
    pub last_reply_author: Option<String>,
    /// Display timestamp of the last reply.
    pub last_reply_time: Option<String>,
    /// Pinned to the top of the board.
    pub pinned: bool,
    /// Closed to new replies.
    pub locked: bool,
    /// Marked as a highlighted (digest) topic.
    pub highlighted: bool,
    /// Replies on the fetched page, opening post excluded.
    pub replies: Vec<Reply>,
    /// Page that was actually fetched.
    pub current_page: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

impl Topic {
    /// Create a topic with only an id and a title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            current_page: 1,
            total_pages: 1,
            ..Default::default()
        }
    }

    /// Whether there is a page after the current one.
    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} by {}", self.id, self.title, self.author)
    }
}

/// A fetched topic page together with the page the caller asked for.
///
/// The forum serves its last page for any page number past the end, so
/// `requested_page` and `topic.current_page` may differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPage {
    /// Page number the caller asked for.
    pub requested_page: u32,
    /// The topic as fetched.
    pub topic: Topic,
}

impl TopicPage {
    /// Page that was actually fetched.
    pub fn actual_page(&self) -> u32 {
        self.topic.current_page
    }

    /// Whether the requested page was past the end and got clamped.
    pub fn was_clamped(&self) -> bool {
        self.requested_page != self.topic.current_page
    }
}
