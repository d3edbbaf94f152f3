//! Crawls one site section: paginated list fetch, bounded-parallel detail
//! fetches, classification, and graceful degradation on blocks and failures.

use crate::classifier;
use crate::enumerator;
use crate::fetcher::{Fetch, FetchResponse};
use crate::models::{FilterConfig, Job, JobStub};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use scraper::Html;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use url::Url;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Site origin; section search pages live under `<base_url>/search/`.
    pub base_url: String,
    /// Detail-fetch pool size. The fetch gate still serializes requests on
    /// the wire, so this bounds in-flight work, not request rate.
    pub thread_count: usize,
    /// Whole-run request ceiling; `None` is unbounded.
    pub max_requests: Option<usize>,
    /// Whole-run wall-clock ceiling; `None` is unbounded.
    pub max_runtime: Option<Duration>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://chicago.craigslist.org".to_string(),
            thread_count: 4,
            max_requests: None,
            max_runtime: None,
        }
    }
}

/// Shared run ceilings, checked between page fetches so a crawl can be cut
/// short without losing what it already collected.
pub struct CrawlBudget {
    started: Instant,
    requests: AtomicUsize,
    max_requests: Option<usize>,
    max_runtime: Option<Duration>,
}

impl CrawlBudget {
    pub fn new(max_requests: Option<usize>, max_runtime: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicUsize::new(0),
            max_requests,
            max_runtime,
        }
    }

    pub fn record(&self, requests: usize) {
        self.requests.fetch_add(requests, Ordering::Relaxed);
    }

    pub fn exhausted(&self) -> bool {
        if let Some(max) = self.max_requests {
            if self.requests.load(Ordering::Relaxed) >= max {
                return true;
            }
        }
        if let Some(max) = self.max_runtime {
            if self.started.elapsed() >= max {
                return true;
            }
        }
        false
    }
}

/// Non-success status, or the page-content signature the site serves once it
/// has decided we are a bot.
fn is_blocked(response: &FetchResponse) -> bool {
    !response.is_success() || response.body.to_lowercase().contains("blocked")
}

pub struct SectionCrawler<'a, F: Fetch> {
    fetcher: &'a F,
    config: &'a CrawlConfig,
    filter: &'a FilterConfig,
}

impl<'a, F: Fetch> SectionCrawler<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a CrawlConfig, filter: &'a FilterConfig) -> Self {
        Self {
            fetcher,
            config,
            filter,
        }
    }

    /// Crawls one section to completion, its job-count ceiling, or its
    /// budget, whichever comes first. Always returns what it accumulated:
    /// a section that cannot be crawled at all yields an empty list, never
    /// an error.
    pub fn crawl(&self, section: &str, budget: &CrawlBudget) -> Vec<Job> {
        let mut jobs = Vec::new();
        let mut remaining = if self.filter.max_jobs == 0 {
            usize::MAX
        } else {
            self.filter.max_jobs
        };

        let start = format!("{}/search/{}", self.config.base_url, section);
        let mut page_url = match Url::parse(&start) {
            Ok(url) => url,
            Err(err) => {
                tracing::error!(section, url = start, error = %err, "invalid section url");
                return jobs;
            }
        };

        loop {
            if budget.exhausted() {
                tracing::info!(section, collected = jobs.len(), "crawl budget exhausted");
                break;
            }

            budget.record(1);
            let response = match self.fetcher.fetch(page_url.as_str()) {
                Ok(response) => response,
                Err(err) => {
                    tracing::error!(section, url = %page_url, error = %err, "list page fetch failed");
                    break;
                }
            };
            if is_blocked(&response) {
                tracing::error!(
                    section,
                    url = %page_url,
                    status = response.status,
                    "possibly blocked or error response, aborting section"
                );
                break;
            }

            let page = Html::parse_document(&response.body);
            let (stubs, next_page) = enumerator::enumerate(&page, &page_url);
            if stubs.is_empty() {
                break;
            }

            let batch: Vec<JobStub> = stubs.into_iter().take(remaining).collect();
            remaining -= batch.len();
            budget.record(batch.len());
            jobs.extend(self.fetch_details(section, &batch));

            if remaining == 0 {
                tracing::info!(section, collected = jobs.len(), "reached job ceiling");
                break;
            }
            match next_page {
                Some(next) => {
                    tracing::info!(section, next, "following next page");
                    match Url::parse(&next) {
                        Ok(url) => page_url = url,
                        Err(err) => {
                            tracing::warn!(section, next, error = %err, "unusable next page link");
                            break;
                        }
                    }
                }
                None => break,
            }
        }

        jobs
    }

    /// Fetches and classifies one page's stubs on a bounded pool. Collection
    /// order is the stub order; a failed detail fetch drops that one listing.
    fn fetch_details(&self, section: &str, stubs: &[JobStub]) -> Vec<Job> {
        let fetch_one = |stub: &JobStub| -> Option<Job> {
            let response = match self.fetcher.fetch(&stub.url) {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(url = stub.url, error = %err, "detail fetch failed, dropping listing");
                    return None;
                }
            };
            if is_blocked(&response) {
                tracing::warn!(
                    url = stub.url,
                    status = response.status,
                    "blocked or error on detail page, dropping listing"
                );
                return None;
            }
            let page = Html::parse_document(&response.body);
            classifier::classify(&page, stub, section, self.filter)
        };

        match ThreadPoolBuilder::new()
            .num_threads(self.config.thread_count)
            .build()
        {
            Ok(pool) => pool.install(|| stubs.par_iter().filter_map(&fetch_one).collect()),
            Err(err) => {
                tracing::warn!(error = %err, "detail pool unavailable, fetching serially");
                stubs.iter().filter_map(&fetch_one).collect()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory fetcher recording every issued request.
    pub(crate) struct StubFetch {
        pages: HashMap<String, String>,
        pub(crate) hits: Mutex<Vec<String>>,
    }

    impl StubFetch {
        pub(crate) fn new(pages: Vec<(String, String)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
                hits: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn detail_hits(&self) -> usize {
            self.hits
                .lock()
                .unwrap()
                .iter()
                .filter(|url| !url.contains("/search/"))
                .count()
        }
    }

    impl Fetch for StubFetch {
        fn fetch(&self, url: &str) -> Result<FetchResponse, crate::fetcher::FetchError> {
            self.hits.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(FetchResponse {
                    status: 200,
                    body: body.clone(),
                }),
                None => Ok(FetchResponse {
                    status: 404,
                    body: String::new(),
                }),
            }
        }
    }

    pub(crate) const BASE: &str = "https://site.test";

    pub(crate) fn list_page(links: &[String], next: Option<&str>) -> String {
        let rows: String = links
            .iter()
            .map(|href| {
                format!(
                    r#"<li class="cl-static-search-result"><div class="title"><a href="{href}">job</a></div></li>"#
                )
            })
            .collect();
        let next = next
            .map(|href| format!(r#"<a class="button next" href="{href}">next</a>"#))
            .unwrap_or_default();
        format!("<html><body><ul>{rows}</ul>{next}</body></html>")
    }

    pub(crate) fn detail_page(text: &str) -> String {
        format!(r#"<html><body><section id="postingbody">{text}</section></body></html>"#)
    }

    fn open_filter(max_jobs: usize) -> FilterConfig {
        FilterConfig::new(Vec::new(), 7, Vec::new(), max_jobs)
    }

    pub(crate) fn config() -> CrawlConfig {
        CrawlConfig {
            base_url: BASE.to_string(),
            thread_count: 1,
            max_requests: None,
            max_runtime: None,
        }
    }

    fn detail_url(id: usize) -> String {
        format!("{BASE}/chi/d/{id}.html")
    }

    fn section_url(suffix: &str) -> String {
        format!("{BASE}/search/{suffix}")
    }

    #[test]
    fn ceiling_bounds_detail_fetches_per_page() {
        // Five rows, ceiling of two: exactly two detail fetches.
        let links: Vec<String> = (1..=5).map(detail_url).collect();
        let mut pages = vec![(section_url("jjj"), list_page(&links, None))];
        for link in &links {
            pages.push((link.clone(), detail_page("editing work")));
        }

        let fetch = StubFetch::new(pages);
        let cfg = config();
        let filter = open_filter(2);
        let crawler = SectionCrawler::new(&fetch, &cfg, &filter);
        let jobs = crawler.crawl("jjj", &CrawlBudget::new(None, None));

        assert_eq!(fetch.detail_hits(), 2);
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn ceiling_spans_pages() {
        let second = section_url("jjj?s=2");
        let p1 = list_page(&[detail_url(1), detail_url(2)], Some(&second));
        let p2 = list_page(&[detail_url(3), detail_url(4)], None);
        let mut pages = vec![(section_url("jjj"), p1), (second, p2)];
        for i in 1..=4 {
            pages.push((detail_url(i), detail_page("work")));
        }

        let fetch = StubFetch::new(pages);
        let cfg = config();
        let filter = open_filter(3);
        let crawler = SectionCrawler::new(&fetch, &cfg, &filter);
        let jobs = crawler.crawl("jjj", &CrawlBudget::new(None, None));

        assert_eq!(fetch.detail_hits(), 3);
        assert_eq!(jobs.len(), 3);
    }

    #[test]
    fn blocked_list_page_keeps_accumulated_listings() {
        let second = section_url("jjj?s=1");
        let pages = vec![
            (section_url("jjj"), list_page(&[detail_url(1)], Some(&second))),
            (
                second.clone(),
                "<html><body>This network has been blocked.</body></html>".to_string(),
            ),
            (detail_url(1), detail_page("first page job")),
        ];

        let fetch = StubFetch::new(pages);
        let cfg = config();
        let filter = open_filter(0);
        let crawler = SectionCrawler::new(&fetch, &cfg, &filter);
        let jobs = crawler.crawl("jjj", &CrawlBudget::new(None, None));

        assert_eq!(jobs.len(), 1);
        assert_eq!(fetch.detail_hits(), 1);
    }

    #[test]
    fn failed_detail_fetch_drops_only_that_listing() {
        let pages = vec![
            (
                section_url("jjj"),
                list_page(&[detail_url(1), detail_url(2)], None),
            ),
            // detail 1 unmapped -> 404
            (detail_url(2), detail_page("surviving job")),
        ];

        let fetch = StubFetch::new(pages);
        let cfg = config();
        let filter = open_filter(0);
        let crawler = SectionCrawler::new(&fetch, &cfg, &filter);
        let jobs = crawler.crawl("jjj", &CrawlBudget::new(None, None));

        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].description.contains("surviving"));
    }

    #[test]
    fn empty_section_completes_without_error() {
        let pages = vec![(
            section_url("jjj"),
            "<html><body><p>Nothing found.</p></body></html>".to_string(),
        )];
        let fetch = StubFetch::new(pages);
        let cfg = config();
        let filter = open_filter(0);
        let crawler = SectionCrawler::new(&fetch, &cfg, &filter);
        assert!(crawler.crawl("jjj", &CrawlBudget::new(None, None)).is_empty());
    }

    #[test]
    fn request_budget_stops_pagination_but_keeps_results() {
        let second = section_url("jjj?s=1");
        let pages = vec![
            (section_url("jjj"), list_page(&[detail_url(1)], Some(&second))),
            (second.clone(), list_page(&[detail_url(2)], None)),
            (detail_url(1), detail_page("budgeted job")),
        ];

        let fetch = StubFetch::new(pages);
        let cfg = config();
        let filter = open_filter(0);
        let crawler = SectionCrawler::new(&fetch, &cfg, &filter);
        // One list fetch plus one detail fetch exhausts the budget.
        let jobs = crawler.crawl("jjj", &CrawlBudget::new(Some(2), None));

        assert_eq!(jobs.len(), 1);
        let hits = fetch.hits.lock().unwrap();
        assert!(!hits.iter().any(|url| url.contains("s=1")));
    }
}
