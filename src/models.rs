use serde::Serialize;

/// A job listing that survived the filter pipeline.
///
/// Serialized field names are the export contract, so renames here would
/// break downstream consumers of the CSV/JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub title: String,
    #[serde(rename = "job_url")]
    pub url: String,
    /// ISO-8601 when the site provided one; `None` sorts below dated entries.
    pub posted_date: Option<String>,
    /// Cleaned free text, or the sentinels `"remote"` / `"N/A"`.
    pub location: String,
    pub short_description: String,
    #[serde(rename = "full_description")]
    pub description: String,
    pub section: String,
    pub scraped_at: String,
}

/// One row from a search-results page, before its detail page is fetched.
#[derive(Debug, Clone)]
pub struct JobStub {
    pub title: String,
    pub url: String,
    pub location: String,
}

impl JobStub {
    pub fn new(title: String, url: String, location: String) -> Self {
        Self {
            title,
            url,
            location,
        }
    }
}

/// Filter criteria for a run. Built once, passed by reference everywhere.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Lower-cased keywords; empty disables keyword filtering.
    pub keywords: Vec<String>,
    /// Listings older than this many days are rejected.
    pub days: i64,
    /// Lower-cased allowed-location tokens; empty disables location filtering.
    pub locations: Vec<String>,
    /// Per-section listing ceiling; 0 means unbounded.
    pub max_jobs: usize,
}

impl FilterConfig {
    /// Lower-cases the keyword and location tokens so the filter stages can
    /// compare without re-normalizing per listing.
    pub fn new(keywords: Vec<String>, days: i64, locations: Vec<String>, max_jobs: usize) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.trim().to_lowercase()).collect(),
            days,
            locations: locations.iter().map(|l| l.trim().to_lowercase()).collect(),
            max_jobs,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keywords: vec!["smm".into(), "video".into(), "tiktok".into()],
            days: 7,
            locations: Vec::new(),
            max_jobs: 100,
        }
    }
}
