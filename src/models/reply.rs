//! Reply model.

/// A follow-up post within a topic, numbered by floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Post ID.
    pub id: String,
    /// ID of the topic this reply belongs to.
    pub topic_id: String,
    /// 1-based position within the topic; 0 when the label was unrecognized.
    pub floor: u32,
    /// Author display name.
    pub author: String,
    /// Author user ID, when linked.
    pub author_id: Option<String>,
    /// Sanitized plain-text body.
    pub content: String,
    /// Display timestamp as shown by the forum.
    pub posted_at: Option<String>,
    /// ID of the reply quoted by this one.
    pub quote_reply_id: Option<String>,
}

impl Reply {
    /// Short single-line preview of the body.
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self.content.lines().next().unwrap_or_default();
        if first_line.chars().count() <= max_chars {
            return first_line.to_string();
        }
        let mut out: String = first_line.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}
