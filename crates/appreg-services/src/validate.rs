//! Input validators shared by the guided flows.
//!
//! Each validator returns `None` when the input is acceptable and
//! `Some(message)` otherwise, the shape [`InputValidator`] expects, so they
//! can be handed to a prompt directly or composed with `or_else`.
//!
//! [`InputValidator`]: crate::prompt::InputValidator

use appreg_core::{DirectoryError, DirectoryResult};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use url::Url;

/// Longest credential lifetime the flows will accept.
pub const MAX_CREDENTIAL_LIFETIME_DAYS: i64 = 730;

const MAX_DISPLAY_NAME_LEN: usize = 120;
const MAX_VALUE_LEN: usize = 250;

/// Display names: non-empty after trimming, bounded length.
pub fn display_name(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some("a name is required".into());
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Some(format!("must be at most {MAX_DISPLAY_NAME_LEN} characters"));
    }
    None
}

/// Any non-empty answer.
pub fn required(input: &str) -> Option<String> {
    if input.trim().is_empty() {
        Some("a value is required".into())
    } else {
        None
    }
}

/// Claim values carried by app roles and permission scopes: non-empty, no
/// whitespace, bounded length.
pub fn claim_value(input: &str) -> Option<String> {
    if input.is_empty() {
        return Some("a value is required".into());
    }
    if input.chars().any(char::is_whitespace) {
        return Some("must not contain spaces".into());
    }
    if input.chars().count() > MAX_VALUE_LEN {
        return Some(format!("must be at most {MAX_VALUE_LEN} characters"));
    }
    None
}

/// Web redirect URIs: absolute, and `https` except for loopback hosts.
pub fn redirect_uri(input: &str) -> Option<String> {
    let url = match Url::parse(input.trim()) {
        Ok(url) => url,
        Err(_) => return Some("must be an absolute URI".into()),
    };
    if url.fragment().is_some() {
        return Some("must not contain a fragment".into());
    }
    match url.scheme() {
        "https" => None,
        "http" => match url.host_str() {
            Some("localhost" | "127.0.0.1" | "[::1]") => None,
            _ => Some("http is only allowed for localhost".into()),
        },
        other => Some(format!("scheme '{other}' is not allowed; use https")),
    }
}

/// Expiry dates entered as `YYYY-MM-DD`: well-formed, in the future and
/// within [`MAX_CREDENTIAL_LIFETIME_DAYS`].
pub fn expiry_date(input: &str) -> Option<String> {
    let date = match NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => return Some("enter a date as YYYY-MM-DD".into()),
    };
    let today = Utc::now().date_naive();
    if date <= today {
        return Some("must be in the future".into());
    }
    let days = (date - today).num_days();
    if days > MAX_CREDENTIAL_LIFETIME_DAYS {
        return Some(format!(
            "must be within {MAX_CREDENTIAL_LIFETIME_DAYS} days"
        ));
    }
    None
}

/// Parses an already validated expiry date into the instant the credential
/// stops working, end of that day in UTC.
pub fn parse_expiry(input: &str) -> DirectoryResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| DirectoryError::InvalidInput(format!("not a date: '{input}'")))?;
    let end_of_day = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| DirectoryError::InvalidInput(format!("not a date: '{input}'")))?;
    Ok(Utc.from_utc_datetime(&end_of_day))
}

/// Rejects `input` when it collides case-insensitively with `taken`.
/// `what` names the colliding thing in the message.
pub fn unique_among(input: &str, taken: &[String], what: &str) -> Option<String> {
    if taken.iter().any(|t| t.eq_ignore_ascii_case(input.trim())) {
        Some(format!("{what} '{}' is already in use", input.trim()))
    } else {
        None
    }
}
