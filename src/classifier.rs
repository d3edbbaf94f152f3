//! Builds the final record from a listing's detail page and decides whether
//! it survives the filter pipeline.

use crate::extractor;
use crate::filters;
use crate::models::{FilterConfig, Job, JobStub};
use chrono::Utc;
use scraper::Html;

const SHORT_DESCRIPTION_CHARS: usize = 200;

/// First 200 characters of the description, backed off to the last word
/// boundary so truncation never cuts mid-word.
pub fn short_description(description: &str) -> String {
    if description.chars().count() <= SHORT_DESCRIPTION_CHARS {
        return description.to_string();
    }

    let truncated: String = description.chars().take(SHORT_DESCRIPTION_CHARS).collect();
    match truncated.rfind(' ') {
        Some(boundary) => truncated[..boundary].to_string(),
        None => truncated,
    }
}

/// Classifies one fetched detail page.
///
/// Assembles the candidate record (title preference, date and description
/// strategies, short description, remote-location override), then runs the
/// filter pipeline. `None` means some stage rejected it; the caller only
/// needs the yes/no, the rejecting stage is logged here.
pub fn classify(
    detail_page: &Html,
    stub: &JobStub,
    section: &str,
    config: &FilterConfig,
) -> Option<Job> {
    let title = if stub.title.is_empty() {
        extractor::detail_title(detail_page).unwrap_or_default()
    } else {
        stub.title.clone()
    };

    let posted_date = extractor::posted_date(detail_page);
    let description = extractor::description(detail_page).unwrap_or_default();

    let mut location = stub.location.clone();
    if location != "remote" && location != "N/A" && description.to_lowercase().contains("remote") {
        location = "remote".to_string();
    }

    if let Err(rejection) = filters::evaluate(
        &title,
        &description,
        posted_date.as_deref(),
        &location,
        config,
    ) {
        tracing::debug!(title, stage = ?rejection, "listing filtered out");
        return None;
    }

    tracing::info!(title, url = stub.url, "scraped job");
    Some(Job {
        title,
        url: stub.url.clone(),
        posted_date,
        short_description: short_description(&description),
        description,
        location,
        section: section.to_string(),
        scraped_at: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(title: &str, location: &str) -> JobStub {
        JobStub::new(
            title.to_string(),
            "https://chicago.craigslist.org/chi/d/x/1.html".to_string(),
            location.to_string(),
        )
    }

    fn open_config() -> FilterConfig {
        FilterConfig::new(Vec::new(), 7, Vec::new(), 0)
    }

    fn detail_page(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn short_description_is_word_boundary_prefix() {
        let word = "word ";
        let long = word.repeat(50); // 250 chars
        let short = short_description(&long);

        assert!(short.len() <= 200);
        assert!(long.starts_with(&short));
        assert!(!short.ends_with(' '));
        // 200 chars land mid-"word "; backing off keeps whole words only.
        assert!(short.split(' ').all(|w| w == "word"));
    }

    #[test]
    fn short_description_equals_short_input() {
        assert_eq!(short_description("brief"), "brief");
        let exactly_200 = "a".repeat(200);
        assert_eq!(short_description(&exactly_200), exactly_200);
    }

    #[test]
    fn unbroken_text_truncates_hard_at_limit() {
        let unbroken = "x".repeat(300);
        assert_eq!(short_description(&unbroken).len(), 200);
    }

    #[test]
    fn description_mentioning_remote_overrides_location() {
        let page = detail_page(
            r#"<section id="postingbody">Fully remote position editing video.</section>"#,
        );
        let job = classify(&page, &stub("Editor", "Chicago (Loop)"), "jjj", &open_config())
            .expect("accepted");
        assert_eq!(job.location, "remote");
    }

    #[test]
    fn na_location_is_not_overridden() {
        let page = detail_page(
            r#"<section id="postingbody">Remote work possible.</section>"#,
        );
        let job = classify(&page, &stub("Editor", "N/A"), "jjj", &open_config()).expect("accepted");
        assert_eq!(job.location, "N/A");
    }

    #[test]
    fn title_re_extracted_from_detail_when_stub_empty() {
        let page = detail_page(
            r#"<span id="titletextonly">Camera operator</span>
               <section id="postingbody">Weekend shoots.</section>"#,
        );
        let job = classify(&page, &stub("", "N/A"), "jjj", &open_config()).expect("accepted");
        assert_eq!(job.title, "Camera operator");
    }

    #[test]
    fn bare_detail_page_fails_open_on_recency_but_not_keywords() {
        // No extractable description or date.
        let page = detail_page("<span>menu</span>");

        // Unfiltered config: still produces a listing with empty fields.
        let job = classify(&page, &stub("Editor", "N/A"), "jjj", &open_config()).expect("accepted");
        assert_eq!(job.description, "");
        assert_eq!(job.short_description, "");
        assert_eq!(job.posted_date, None);

        // With keywords, the haystack is only the title, so it is rejected.
        let cfg = FilterConfig::new(vec!["tiktok".into()], 7, Vec::new(), 0);
        assert!(classify(&page, &stub("Editor", "N/A"), "jjj", &cfg).is_none());
    }

    #[test]
    fn emitted_record_keeps_invariants() {
        let page = detail_page(&format!(
            r#"<time datetime="2024-05-01T09:30:00-0500">may 1</time>
               <section id="postingbody">{}</section>"#,
            "video editing gig ".repeat(30)
        ));
        let cfg = FilterConfig::new(vec!["video".into()], 100_000, Vec::new(), 0);
        let job = classify(&page, &stub("Editor", "Chicago"), "jjj", &cfg).expect("accepted");

        assert!(job.description.starts_with(&job.short_description));
        assert!(job.short_description.chars().count() <= 200);
        assert_eq!(job.posted_date.as_deref(), Some("2024-05-01T09:30:00-0500"));
        assert_eq!(job.section, "jjj");
    }
}
