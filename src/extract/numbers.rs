//! Numeric fields as the forum displays them.

/// Multiplier for the `万` suffix.
const WAN: u64 = 10_000;

/// Floor labels used instead of numbers for the first few replies.
const FLOOR_LABELS: &[(&str, u32)] = &[("沙发", 2), ("板凳", 3), ("地板", 4)];

/// Parse a displayed count, tolerating separators and a `万` suffix.
///
/// Anything unparseable is zero.
pub fn parse_count(text: &str) -> u64 {
    let text = text.trim();
    let (digits, multiplier) = match text.strip_suffix('万') {
        Some(rest) => (rest.trim_end(), WAN),
        None => (text, 1),
    };
    let digits: String = digits.chars().filter(|c| *c != ',').collect();
    digits
        .parse::<u64>()
        .map(|n| n.saturating_mul(multiplier))
        .unwrap_or(0)
}

/// Parse a board's `topics/posts` cell, e.g. `20万/861万` or `2599/151万`.
///
/// The `万` multiplier applies to each side independently. Returns zeros
/// when the cell has no `A/B` shape.
pub fn parse_board_stats(text: &str) -> (u64, u64) {
    let Some((left, right)) = text.split_once('/') else {
        return (0, 0);
    };

    let left = left.trim_end();
    let (left, left_wan) = match left.strip_suffix('万') {
        Some(rest) => (rest.trim_end(), true),
        None => (left, false),
    };
    let start = left
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + left[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let threads = &left[start..];

    let right = right.trim_start();
    let end = right
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(right.len());
    let posts = &right[..end];
    let posts_wan = right[end..].trim_start().starts_with('万');

    let (Ok(threads), Ok(posts)) = (threads.parse::<u64>(), posts.parse::<u64>()) else {
        return (0, 0);
    };
    (
        if left_wan { threads.saturating_mul(WAN) } else { threads },
        if posts_wan { posts.saturating_mul(WAN) } else { posts },
    )
}

/// New-post count from a `(123)` marker.
pub fn parse_new_posts(text: &str) -> u64 {
    text.split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .and_then(|(n, _)| n.trim().parse().ok())
        .unwrap_or(0)
}

/// Floor number from the post-number label.
///
/// Numbers parse as-is; the customary names for floors 2-4 map to their
/// numbers; `楼主` is floor 1; anything else is 0.
pub fn parse_floor_label(label: &str) -> u32 {
    let label = label.trim();
    if let Ok(n) = label.trim_end_matches('#').parse() {
        return n;
    }
    if let Some((_, floor)) = FLOOR_LABELS.iter().find(|(name, _)| *name == label) {
        return *floor;
    }
    if label.contains("楼主") {
        return 1;
    }
    0
}

/// Strip the localized "posted at" prefix from a timestamp.
pub fn strip_posted_at(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix("发表于").unwrap_or(text).trim().to_string()
}
