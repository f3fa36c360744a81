//! Search result model.

/// A reduced topic projection returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResult {
    /// Topic ID.
    pub id: String,
    /// Topic title.
    pub title: String,
    /// Name of the board the topic lives in.
    pub board: String,
    /// Author display name.
    pub author: String,
    /// Number of views.
    pub view_count: u64,
    /// Number of replies.
    pub reply_count: u64,
}
