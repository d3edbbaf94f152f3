//! Runs the section crawler across every requested section and merges the
//! results: first-occurrence URL dedup, then newest-first ordering.

use crate::crawler::{CrawlBudget, CrawlConfig, SectionCrawler};
use crate::fetcher::Fetch;
use crate::models::{FilterConfig, Job};
use crate::pipeline::Crawler;
use crate::Result;
use chrono::{DateTime, NaiveDateTime};
use std::collections::HashSet;

pub struct JobAggregator<F: Fetch> {
    fetcher: F,
    sections: Vec<String>,
    crawl: CrawlConfig,
    filter: FilterConfig,
}

impl<F: Fetch> JobAggregator<F> {
    pub fn new(
        fetcher: F,
        sections: Vec<String>,
        crawl: CrawlConfig,
        filter: FilterConfig,
    ) -> Self {
        Self {
            fetcher,
            sections,
            crawl,
            filter,
        }
    }

    /// Crawls sections strictly one after another, sharing one run budget.
    /// A section that fails entirely contributes nothing but never aborts
    /// the rest of the run.
    pub fn aggregate(&self) -> Vec<Job> {
        let budget = CrawlBudget::new(self.crawl.max_requests, self.crawl.max_runtime);
        let mut all_jobs = Vec::new();

        for section in &self.sections {
            let crawler = SectionCrawler::new(&self.fetcher, &self.crawl, &self.filter);
            let jobs = crawler.crawl(section, &budget);
            tracing::info!(section, count = jobs.len(), "section crawl complete");
            all_jobs.extend(jobs);
        }

        let mut merged = dedup_by_url(all_jobs);
        sort_by_recency(&mut merged);
        merged
    }
}

impl<F: Fetch> Crawler for JobAggregator<F> {
    fn start_crawl(&self) -> Result<Vec<Job>> {
        Ok(self.aggregate())
    }
}

/// First occurrence wins, across section boundaries.
fn dedup_by_url(jobs: Vec<Job>) -> Vec<Job> {
    let mut seen_url = HashSet::new();
    jobs.into_iter()
        .filter(|job| seen_url.insert(job.url.clone()))
        .collect()
}

fn posted_instant(job: &Job) -> Option<NaiveDateTime> {
    let raw = job.posted_date.as_deref()?;
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|posted| posted.naive_utc())
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw.get(..19).unwrap_or(raw), "%Y-%m-%dT%H:%M:%S").ok()
        })
}

/// Newest first; listings without a parsable date sort below all dated ones.
/// When nothing has a parsable date the sort is skipped outright and
/// discovery order stands.
fn sort_by_recency(jobs: &mut [Job]) {
    if !jobs.iter().any(|job| posted_instant(job).is_some()) {
        if !jobs.is_empty() {
            tracing::warn!(count = jobs.len(), "no parsable posted dates, keeping discovery order");
        }
        return;
    }
    jobs.sort_by(|a, b| posted_instant(b).cmp(&posted_instant(a)));
}
