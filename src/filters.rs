//! The three-stage accept/reject chain applied to every classified listing.
//!
//! Stages short-circuit left to right; the first failing stage names itself
//! via [`Rejection`] so the caller can log why a listing was dropped.

use crate::models::FilterConfig;
use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};

/// Which stage rejected a listing. Logging detail only, callers never branch
/// on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Keyword,
    Recency,
    Location,
}

/// Runs keyword, recency, and location stages in order.
pub fn evaluate(
    title: &str,
    description: &str,
    posted_date: Option<&str>,
    location: &str,
    config: &FilterConfig,
) -> Result<(), Rejection> {
    if !matches_keywords(title, description, config) {
        return Err(Rejection::Keyword);
    }
    if !is_recent(posted_date, config.days) {
        return Err(Rejection::Recency);
    }
    if !matches_location(location, config) {
        return Err(Rejection::Location);
    }
    Ok(())
}

/// Accepts when any configured keyword appears in the lower-cased title plus
/// description. An empty keyword set disables the stage.
fn matches_keywords(title: &str, description: &str, config: &FilterConfig) -> bool {
    if config.keywords.is_empty() {
        return true;
    }
    let haystack = format!("{} {}", title, description).to_lowercase();
    config.keywords.iter().any(|kw| haystack.contains(kw))
}

/// Accepts listings posted within the last `days` days.
///
/// Missing or unparsable dates are accepted (fail-open): an unknown date is
/// assumed recent rather than silently dropping the listing. Timestamps with
/// zone info are compared as absolute instants; naive ones against local now.
pub fn is_recent(posted_date: Option<&str>, days: i64) -> bool {
    let Some(raw) = posted_date else {
        return true;
    };

    // Zone-aware forms first: RFC 3339, then the site's colon-less offsets.
    if let Ok(posted) = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
    {
        return posted.with_timezone(&Utc) >= Utc::now() - Duration::days(days);
    }

    let prefix = raw.get(..19).unwrap_or(raw);
    if let Ok(posted) = NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S") {
        return posted >= Local::now().naive_local() - Duration::days(days);
    }

    tracing::warn!(posted_date = raw, "unparsable posted date, treating as recent");
    true
}

/// Accepts when the lower-cased location contains any allowed token. An empty
/// allowed set disables the stage.
fn matches_location(location: &str, config: &FilterConfig) -> bool {
    if config.locations.is_empty() {
        return true;
    }
    let location = location.to_lowercase();
    config.locations.iter().any(|token| location.contains(token))
}
