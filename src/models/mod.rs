//! Domain records produced by the extraction engine.
//!
//! Every record is an immutable value built fresh on each fetch:
//! - Boards from the forum index
//! - Topics from board listings and topic pages
//! - Replies from topic pages
//! - Search results
//! - User identity and check-in outcomes

mod board;
mod checkin;
mod reply;
mod search;
mod topic;
mod user;

pub use board::Board;
pub use checkin::{CheckIn, Reward};
pub use reply::Reply;
pub use search::SearchResult;
pub use topic::{Topic, TopicPage};
pub use user::UserIdentity;
