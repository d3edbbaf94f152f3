pub mod aggregator;
pub mod classifier;
pub mod crawler;
pub mod enumerator;
pub mod extractor;
pub mod fetcher;
pub mod filters;
pub mod models;
pub mod pipeline;
pub mod writer;

pub use aggregator::JobAggregator;
pub use crawler::{CrawlBudget, CrawlConfig, SectionCrawler};
pub use fetcher::{Fetch, FetchError, FetchResponse, PoliteClient};
pub use filters::Rejection;
pub use models::{FilterConfig, Job, JobStub};
pub use pipeline::{CrawlPipeline, Crawler};
pub use writer::{save_to_csv, save_to_json};

// Send + Sync so errors can cross the detail-fetch thread pool.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
