//! Anti-forgery tokens and response markers.
//!
//! State-changing requests echo a `formhash` taken from the page loaded
//! just before them. Responses to those requests are either full pages or
//! AJAX envelopes (`<root><![CDATA[...]]></root>`); the helpers here read
//! both.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use super::{attr, text_of};
use crate::models::{CheckIn, Reward};

/// Reward vocabulary recognized in check-in messages.
const REWARD_KINDS: &str = "金币|积分|经验|战斗力|威望|贡献|体力|鹅";

/// Markers meaning today's check-in already happened.
const ALREADY_MARKERS: &[&str] = &["已签到", "已经签到", "今日已"];

/// Display name of an anonymous visitor.
const GUEST_NAME: &str = "游客";

/// Markers meaning the request needs a logged-in session.
const LOGIN_MARKERS: &[&str] = &["请先登录", "需要先登录", "您需要登录"];

macro_rules! cached {
    ($kind:ty, $build:expr) => {{
        static CELL: OnceLock<Option<$kind>> = OnceLock::new();
        CELL.get_or_init(|| $build.ok()).as_ref()
    }};
}

fn formhash_input() -> Option<&'static Selector> {
    cached!(Selector, Selector::parse("input[name='formhash']"))
}

fn formhash_link() -> Option<&'static Selector> {
    cached!(Selector, Selector::parse("a[href*='formhash=']"))
}

fn check_in_link() -> Option<&'static Selector> {
    cached!(
        Selector,
        Selector::parse("a[href*='daily_attendance'], a[href*='dsu_paulsign'], a[href*='mod=sign']")
    )
}

fn login_form() -> Option<&'static Selector> {
    cached!(Selector, Selector::parse("form[name='login']"))
}

fn script() -> Option<&'static Selector> {
    cached!(Selector, Selector::parse("script"))
}

fn error_region() -> Option<&'static Selector> {
    cached!(
        Selector,
        Selector::parse("div.alert_error, div#messagetext p, div#messagetext, div.alert_info")
    )
}

fn user_region() -> Option<&'static Selector> {
    cached!(Selector, Selector::parse("div#um, div.vwmy"))
}

fn user_name() -> Option<&'static Selector> {
    cached!(Selector, Selector::parse("a.vwmy, strong"))
}

fn loginhash_pattern() -> Option<&'static Regex> {
    cached!(Regex, Regex::new(r#"loginhash['"]?\s*[:=]\s*['"]([a-zA-Z0-9]+)"#))
}

fn reward_patterns() -> Option<&'static (Regex, Regex)> {
    cached!(
        (Regex, Regex),
        Regex::new(&format!(r"({REWARD_KINDS})\s*[+＋:：]?\s*(\d+)")).and_then(|kind_first| {
            Regex::new(&format!(r"[+＋]?(\d+)\s*({REWARD_KINDS})"))
                .map(|amount_first| (kind_first, amount_first))
        })
    )
}

/// Value of a `formhash=` query parameter in `href`.
fn query_formhash(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("formhash=")?;
    let token: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
    (!token.is_empty()).then_some(token)
}

/// The page's form token, from a hidden input or, failing that, any link
/// carrying it in its query string.
pub fn find_formhash(doc: &Html) -> Option<String> {
    let from_input = formhash_input().and_then(|sel| {
        doc.select(sel)
            .find_map(|input| attr(input, "value"))
            .map(str::to_string)
    });
    from_input.or_else(|| {
        formhash_link()
            .and_then(|sel| doc.select(sel).find_map(|a| attr(a, "href").and_then(query_formhash)))
    })
}

/// The login handshake token, from the login form's target or an inline
/// script.
pub fn find_loginhash(doc: &Html) -> Option<String> {
    let from_form = login_form().and_then(|sel| {
        doc.select(sel).find_map(|form| {
            let action = attr(form, "action")?;
            let (_, rest) = action.split_once("loginhash=")?;
            let hash = rest.split('&').next().unwrap_or_default();
            (!hash.is_empty()).then(|| hash.to_string())
        })
    });
    from_form.or_else(|| {
        let re = loginhash_pattern()?;
        doc.select(script()?).find_map(|s| {
            let text: String = s.text().collect();
            re.captures(&text).map(|caps| caps[1].to_string())
        })
    })
}

/// Check-in link and its form token.
///
/// The token comes from the page's form field, or from the link's query
/// string when the page has no form.
pub fn find_check_in_token(doc: &Html) -> (Option<String>, Option<String>) {
    let link = check_in_link()
        .and_then(|sel| doc.select(sel).find_map(|a| attr(a, "href")))
        .map(str::to_string);
    let token = formhash_input()
        .and_then(|sel| {
            doc.select(sel)
                .find_map(|input| attr(input, "value"))
                .map(str::to_string)
        })
        .or_else(|| link.as_deref().and_then(query_formhash));
    (link, token)
}

/// Name shown in the page's current-user region, unless it is the guest
/// placeholder.
pub fn find_current_user(doc: &Html) -> Option<String> {
    let region = doc.select(user_region()?).next()?;
    let name = region.select(user_name()?).next().map(text_of)?;
    (!name.is_empty() && name != GUEST_NAME).then_some(name)
}

/// Whether the page offers a logout link.
pub fn has_logout_link(body: &str) -> bool {
    body.contains("退出") || body.to_lowercase().contains("logout")
}

/// Payload of an AJAX envelope, or the body itself.
pub fn ajax_payload(body: &str) -> &str {
    body.split_once("<![CDATA[")
        .and_then(|(_, rest)| rest.rsplit_once("]]>"))
        .map(|(payload, _)| payload)
        .unwrap_or(body)
}

/// Visible text of a response, whitespace collapsed.
pub fn visible_text(body: &str) -> String {
    let fragment = Html::parse_fragment(ajax_payload(body));
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the page's error region, if any.
pub fn error_message(body: &str) -> Option<String> {
    let doc = Html::parse_document(ajax_payload(body));
    let sel = error_region()?;
    doc.select(sel)
        .map(text_of)
        .find(|text| !text.is_empty())
}

/// How a check-in attempt went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// Checked in now or earlier today.
    Done(CheckIn),
    /// The session is not logged in.
    LoginRequired,
    /// Anything else, with whatever message the page offered.
    Failed(String),
}

/// Classify a check-in response.
pub fn classify_check_in(body: &str) -> CheckInOutcome {
    let text = visible_text(body);
    if ALREADY_MARKERS.iter().any(|m| text.contains(m)) {
        return CheckInOutcome::Done(CheckIn::AlreadyCheckedIn);
    }
    if LOGIN_MARKERS.iter().any(|m| text.contains(m)) {
        return CheckInOutcome::LoginRequired;
    }

    let rewards = extract_rewards(&text);
    if !rewards.is_empty() || text.contains("签到成功") {
        return CheckInOutcome::Done(CheckIn::Rewarded {
            rewards,
            message: text,
        });
    }

    let message = error_message(body)
        .or_else(|| (!text.is_empty()).then(|| text.chars().take(200).collect()))
        .unwrap_or_else(|| "empty response".to_string());
    CheckInOutcome::Failed(message)
}

/// Reward amounts named in a check-in message.
pub fn extract_rewards(text: &str) -> Vec<Reward> {
    let Some((kind_first, amount_first)) = reward_patterns() else {
        return Vec::new();
    };
    let mut rewards: Vec<Reward> = kind_first
        .captures_iter(text)
        .filter_map(|caps| {
            Some(Reward {
                kind: caps[1].to_string(),
                amount: caps[2].parse().ok()?,
            })
        })
        .collect();
    if rewards.is_empty() {
        rewards = amount_first
            .captures_iter(text)
            .filter_map(|caps| {
                Some(Reward {
                    kind: caps[2].to_string(),
                    amount: caps[1].parse().ok()?,
                })
            })
            .collect();
    }
    rewards
}
