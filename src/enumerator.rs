//! Turns one search-results page into listing stubs plus the next-page link.

use crate::extractor;
use crate::models::JobStub;
use scraper::Html;
use url::Url;

/// Normalizes a raw results-page location: trims whitespace and surrounding
/// parentheses, maps empty to `"N/A"` and anything mentioning remote work to
/// the `"remote"` sentinel.
pub fn normalize_location(raw: Option<&str>) -> String {
    let cleaned = raw
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '(' || c == ')' || c == ' ')
        .to_string();

    if cleaned.is_empty() {
        "N/A".to_string()
    } else if cleaned.to_lowercase().contains("remote") {
        "remote".to_string()
    } else {
        cleaned
    }
}

/// Resolves a possibly-relative detail link against the page it came from.
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(String::from)
}

/// Extracts the ordered listing stubs on a results page and the link to the
/// next page. An empty stub list is a terminal condition, not an error: the
/// section may have run out, or the markup drifted past every row strategy.
pub fn enumerate(page: &Html, page_url: &Url) -> (Vec<JobStub>, Option<String>) {
    let rows = extractor::job_rows(page);
    if rows.is_empty() {
        tracing::warn!(url = %page_url, "no listing rows found, page structure may have changed");
        return (Vec::new(), None);
    }
    tracing::info!(url = %page_url, rows = rows.len(), "found listing rows");

    let stubs = rows
        .iter()
        .filter_map(|row| {
            let url = extractor::row_url(row).and_then(|href| resolve_url(page_url, &href))?;
            let title = extractor::row_title(row).unwrap_or_default();
            let location = normalize_location(extractor::row_location(row).as_deref());
            Some(JobStub::new(title, url, location))
        })
        .collect();

    let next_page = extractor::next_page_url(page)
        .and_then(|href| resolve_url(page_url, &href));

    (stubs, next_page)
}
