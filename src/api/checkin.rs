//! Daily check-in.

use scraper::Html;
use tracing::{debug, info, warn};

use super::fetch;
use super::AuthApi;
use crate::extract::{
    classify_check_in, find_check_in_token, find_current_user, has_logout_link, CheckInOutcome,
};
use crate::models::CheckIn;
use crate::transport::RequestSpec;
use crate::{Result, S1Error};

/// What the home page offers for checking in.
#[derive(Debug, PartialEq, Eq)]
struct CheckInTarget {
    link: Option<String>,
    token: Option<String>,
    logged_in: bool,
}

impl CheckInTarget {
    fn from_body(body: &str) -> Self {
        let doc = Html::parse_document(body);
        let (link, token) = find_check_in_token(&doc);
        Self {
            link,
            token,
            logged_in: find_current_user(&doc).is_some() || has_logout_link(body),
        }
    }

    /// The request path, with the token appended unless the link already
    /// carries one.
    fn request_path(self) -> Result<String> {
        let (link, token) = match (self.link, self.token) {
            (Some(link), Some(token)) => (link, token),
            _ if !self.logged_in => {
                return Err(S1Error::Authentication("not logged in".to_string()))
            }
            (None, _) => return Err(S1Error::Api("no check-in link available".to_string())),
            (Some(_), None) => {
                return Err(S1Error::Api("no check-in token on the page".to_string()))
            }
        };
        if link.contains("formhash=") {
            return Ok(link);
        }
        let separator = if link.contains('?') { '&' } else { '?' };
        Ok(format!("{link}{separator}formhash={token}"))
    }
}

impl AuthApi<'_> {
    /// Check in for today.
    ///
    /// Having already checked in today counts as success.
    pub async fn daily_check_in(&self) -> Result<CheckIn> {
        let home = fetch(
            self.transport,
            &self.retry,
            "load home page",
            RequestSpec::get("forum.php"),
        )
        .await?;
        let path = CheckInTarget::from_body(&home.body).request_path()?;
        debug!("Checking in via {}", path);

        let response = fetch(self.transport, &self.retry, "check in", RequestSpec::get(path)).await?;
        match classify_check_in(&response.body) {
            CheckInOutcome::Done(outcome) => {
                if outcome.is_new() {
                    info!("Checked in: {:?}", outcome);
                } else {
                    info!("Already checked in today");
                }
                Ok(outcome)
            }
            CheckInOutcome::LoginRequired => {
                Err(S1Error::Authentication("check-in requires login".to_string()))
            }
            CheckInOutcome::Failed(message) => {
                warn!("Check-in failed: {}", message);
                Err(S1Error::Api(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_appends_token() {
        let body = r#"<html><body>
            <div id="um"><strong class="vwmy"><a href="space-uid-42.html">alice</a></strong>
            <a href="member.php?mod=logging&amp;action=logout">退出</a></div>
            <input type="hidden" name="formhash" value="cafe01" />
            <a href="plugin.php?id=dsu_paulsign:sign">签到</a>
            </body></html>"#;
        let target = CheckInTarget::from_body(body);
        assert!(target.logged_in);
        assert_eq!(
            target.request_path().unwrap(),
            "plugin.php?id=dsu_paulsign:sign&formhash=cafe01"
        );
    }

    #[test]
    fn test_target_token_in_link() {
        let body = r#"<a href="study_daily_attendance-daily_attendance.html?formhash=beef02">打卡</a><a>退出</a>"#;
        let target = CheckInTarget::from_body(body);
        assert_eq!(target.token.as_deref(), Some("beef02"));
        assert_eq!(
            target.request_path().unwrap(),
            "study_daily_attendance-daily_attendance.html?formhash=beef02"
        );
    }

    #[test]
    fn test_target_not_logged_in() {
        let body = r#"<div id="um"><strong>游客</strong></div>"#;
        let result = CheckInTarget::from_body(body).request_path();
        assert!(matches!(result, Err(S1Error::Authentication(_))));
    }

    #[test]
    fn test_target_no_link() {
        let body = r#"<input type="hidden" name="formhash" value="cafe01" /><a href="x">退出</a>"#;
        let result = CheckInTarget::from_body(body).request_path();
        assert!(
            matches!(result, Err(S1Error::Api(ref m)) if m.contains("no check-in link"))
        );
    }
}
