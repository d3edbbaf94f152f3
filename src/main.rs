use craigslist_jobs::{
    CrawlConfig, CrawlPipeline, FilterConfig, JobAggregator, PoliteClient, Result,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let fetcher = PoliteClient::new()?;
    let sections = vec!["jjj".to_string(), "mar".to_string(), "crg".to_string()];

    let aggregator = JobAggregator::new(
        fetcher,
        sections,
        CrawlConfig::default(),
        FilterConfig::default(),
    );

    CrawlPipeline::new()
        .crawl(aggregator)?
        .save_and_then("jobs.csv")
        .save_json("jobs.json");

    Ok(())
}
