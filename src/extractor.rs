//! Field extraction with ordered fallback strategies.
//!
//! Craigslist has shipped several listing layouts over the years, so every
//! field is extracted by trying the current selectors first and degrading to
//! older or more generic ones. A missing field is a normal value, never an
//! error: each strategy is a pure function returning `Option<String>` and the
//! first non-empty result wins.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Strategy over one listing row on a results page.
pub type RowStrategy = for<'a, 'b> fn(&'a ElementRef<'b>) -> Option<String>;
/// Strategy over a whole page document.
pub type PageStrategy = fn(&Html) -> Option<String>;

pub fn extract_row(row: &ElementRef<'_>, strategies: &[RowStrategy]) -> Option<String> {
    strategies
        .iter()
        .find_map(|strategy| strategy(row).filter(|value| !value.trim().is_empty()))
}

pub fn extract_page(document: &Html, strategies: &[PageStrategy]) -> Option<String> {
    strategies
        .iter()
        .find_map(|strategy| strategy(document).filter(|value| !value.trim().is_empty()))
}

fn select_text(row: &ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text = row
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    Some(text)
}

fn select_attr(row: &ElementRef<'_>, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let value = row.select(&selector).next()?.value().attr(attr)?.to_string();
    Some(value)
}

fn document_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    Some(text)
}

fn document_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let value = document
        .select(&selector)
        .next()?
        .value()
        .attr(attr)?
        .to_string();
    Some(value)
}

// ---- listing rows ---------------------------------------------------------

const ROW_SELECTORS: &[&str] = &[
    // Current static-result layout.
    "li.cl-static-search-result",
    // Pre-2023 layout.
    "li.result-row",
    // Any list item still carrying a posting id.
    "li[data-pid]",
    // Last resort: anything result-ish.
    r#"li[class*="result"]"#,
];

/// Finds the ordered listing rows on a results page. Empty means either a
/// genuinely empty section or markup drift past every known layout; callers
/// treat both as a terminal page.
pub fn job_rows(document: &Html) -> Vec<ElementRef<'_>> {
    for row_selector in ROW_SELECTORS {
        let Ok(selector) = Selector::parse(row_selector) else {
            continue;
        };
        let rows: Vec<_> = document.select(&selector).collect();
        if !rows.is_empty() {
            tracing::debug!(selector = row_selector, rows = rows.len(), "matched listing rows");
            return rows;
        }
    }
    Vec::new()
}

// ---- per-row fields -------------------------------------------------------

fn title_modern(row: &ElementRef<'_>) -> Option<String> {
    select_text(row, "div.title a")
}

fn title_app_anchor(row: &ElementRef<'_>) -> Option<String> {
    select_text(row, "a.cl-app-anchor")
}

fn title_legacy(row: &ElementRef<'_>) -> Option<String> {
    select_text(row, "a.result-title")
}

pub const TITLE_STRATEGIES: &[RowStrategy] = &[title_modern, title_app_anchor, title_legacy];

pub fn row_title(row: &ElementRef<'_>) -> Option<String> {
    extract_row(row, TITLE_STRATEGIES)
}

fn url_modern(row: &ElementRef<'_>) -> Option<String> {
    select_attr(row, "div.title a", "href")
}

fn url_app_anchor(row: &ElementRef<'_>) -> Option<String> {
    select_attr(row, "a.cl-app-anchor", "href")
}

fn url_legacy(row: &ElementRef<'_>) -> Option<String> {
    select_attr(row, "a.result-title", "href")
}

pub const URL_STRATEGIES: &[RowStrategy] = &[url_modern, url_app_anchor, url_legacy];

pub fn row_url(row: &ElementRef<'_>) -> Option<String> {
    extract_row(row, URL_STRATEGIES)
}

fn location_modern(row: &ElementRef<'_>) -> Option<String> {
    select_text(row, "div.details > div.location")
}

fn location_result_meta(row: &ElementRef<'_>) -> Option<String> {
    select_text(row, "div.result-meta .result-hood")
}

fn location_hood(row: &ElementRef<'_>) -> Option<String> {
    select_text(row, ".result-hood")
}

pub const LOCATION_STRATEGIES: &[RowStrategy] =
    &[location_modern, location_result_meta, location_hood];

pub fn row_location(row: &ElementRef<'_>) -> Option<String> {
    extract_row(row, LOCATION_STRATEGIES)
}

// ---- pagination -----------------------------------------------------------

fn next_page_button(document: &Html) -> Option<String> {
    document_attr(document, "a.button.next", "href")
}

fn next_page_anchor(document: &Html) -> Option<String> {
    document_attr(document, "a.next", "href")
}

/// Scans every anchor for "next" in its text or class list, the equivalent of
/// the old XPath `//a[contains(text(), 'next') or contains(@class, 'next')]`.
fn next_page_scan(document: &Html) -> Option<String> {
    let selector = Selector::parse("a[href]").ok()?;
    document.select(&selector).find_map(|anchor| {
        let text = anchor.text().collect::<String>().to_lowercase();
        let classes = anchor.value().attr("class").unwrap_or_default().to_lowercase();
        if text.contains("next") || classes.contains("next") {
            anchor.value().attr("href").map(str::to_string)
        } else {
            None
        }
    })
}

pub const NEXT_PAGE_STRATEGIES: &[PageStrategy] =
    &[next_page_button, next_page_anchor, next_page_scan];

pub fn next_page_url(document: &Html) -> Option<String> {
    extract_page(document, NEXT_PAGE_STRATEGIES)
}

// ---- detail page ----------------------------------------------------------

fn detail_title_text_only(document: &Html) -> Option<String> {
    document_text(document, "span#titletextonly")
}

fn detail_title_heading(document: &Html) -> Option<String> {
    document_text(document, "h1.postingtitle")
}

pub const DETAIL_TITLE_STRATEGIES: &[PageStrategy] =
    &[detail_title_text_only, detail_title_heading];

pub fn detail_title(document: &Html) -> Option<String> {
    extract_page(document, DETAIL_TITLE_STRATEGIES)
}

fn date_time_element(document: &Html) -> Option<String> {
    document_attr(document, "time", "datetime")
}

fn date_posting_infos(document: &Html) -> Option<String> {
    document_attr(document, ".postinginfos time", "datetime")
}

fn date_posting_infos_text(document: &Html) -> Option<String> {
    document_text(document, ".postinginfos .date")
}

pub const POSTED_DATE_STRATEGIES: &[PageStrategy] =
    &[date_time_element, date_posting_infos, date_posting_infos_text];

pub fn posted_date(document: &Html) -> Option<String> {
    extract_page(document, POSTED_DATE_STRATEGIES)
}

// ---- description ----------------------------------------------------------

/// Drops the "QR Code Link to This Post" notice craigslist prepends to
/// posting bodies.
pub fn strip_boilerplate(description: &str) -> String {
    let re = Regex::new(r"^QR Code Link to This Post\s*").unwrap();
    re.replace(description, "").trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn description_posting_body(document: &Html) -> Option<String> {
    let selector = Selector::parse("#postingbody").ok()?;
    let text = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    Some(strip_boilerplate(&collapse_whitespace(&text)))
}

fn description_user_body(document: &Html) -> Option<String> {
    let selector = Selector::parse(".userbody").ok()?;
    let text = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    Some(strip_boilerplate(&collapse_whitespace(&text)))
}

/// Last resort when no posting-body container matches: take whole-page text
/// nodes, drop short fragments and obvious chrome, keep the first ten.
fn description_page_scan(document: &Html) -> Option<String> {
    let selector = Selector::parse("body").ok()?;
    let body = document.select(&selector).next()?;

    let fragments: Vec<String> = body
        .text()
        .map(str::trim)
        .filter(|text| {
            text.len() > 10
                && !["craigslist", "navigation", "menu", "search"]
                    .iter()
                    .any(|term| text.to_lowercase().contains(term))
        })
        .take(10)
        .map(str::to_string)
        .collect();

    if fragments.is_empty() {
        None
    } else {
        Some(collapse_whitespace(&fragments.join(" ")))
    }
}

pub const DESCRIPTION_STRATEGIES: &[PageStrategy] = &[
    description_posting_body,
    description_user_body,
    description_page_scan,
];

pub fn description(document: &Html) -> Option<String> {
    extract_page(document, DESCRIPTION_STRATEGIES)
}
