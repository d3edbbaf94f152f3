use crate::writer::{save_to_csv, save_to_json};
use crate::{Job, Result};

pub struct CrawlPipeline;

#[must_use = "pipeline must end with .save() to execute"]
pub struct PipelineWithJobs {
    jobs: Vec<Job>,
}

impl CrawlPipeline {
    pub fn new() -> Self {
        Self
    }

    pub fn crawl<C>(self, crawler: C) -> Result<PipelineWithJobs>
    where
        C: Crawler,
    {
        let jobs = crawler.start_crawl()?;
        Ok(PipelineWithJobs { jobs })
    }
}

impl Default for CrawlPipeline {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Crawler {
    fn start_crawl(&self) -> Result<Vec<Job>>;
}

impl PipelineWithJobs {
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    #[must_use = "save_and_then() returns Self to allow chaining"]
    pub fn save_and_then(self, path: impl Into<String>) -> Self {
        let path = path.into();
        match save_to_csv(&self.jobs, &path) {
            Ok(_) => println!("✅ saved csv: {}", path),
            Err(e) => eprintln!("❌ csv save failed ({}): {}", path, e),
        }
        self
    }

    pub fn save(self, path: impl Into<String>) {
        let path = path.into();
        match save_to_csv(&self.jobs, &path) {
            Ok(_) => println!("✅ saved csv: {}", path),
            Err(e) => eprintln!("❌ csv save failed ({}): {}", path, e),
        }
    }

    pub fn save_json(self, path: impl Into<String>) {
        let path = path.into();
        match save_to_json(&self.jobs, &path) {
            Ok(_) => println!("✅ saved json: {}", path),
            Err(e) => eprintln!("❌ json save failed ({}): {}", path, e),
        }
    }
}
