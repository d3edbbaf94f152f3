//! HTTP fetching with the politeness rules the crawl depends on: one
//! in-flight request at a time, randomized delay between requests, adaptive
//! slowdown when the site gets slow, robots.txt compliance, and a short-lived
//! response cache so a URL is not re-fetched within the same window.

use rand::Rng;
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Realistic browser user-agent; the site blocks obvious bot agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Base delay between consecutive requests, randomized to 50-150%.
const BASE_DELAY: Duration = Duration::from_secs(2);
/// Adaptive throttle bounds.
const MIN_THROTTLE: Duration = Duration::from_secs(1);
const MAX_THROTTLE: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CACHE_TTL: Duration = Duration::from_secs(60);
const CACHE_CAPACITY: usize = 64;
const ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Shorter TTL when robots.txt could not be fetched, so we retry soon.
const ROBOTS_FAILURE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("disallowed by robots.txt: {0}")]
    Disallowed(String),
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The fetch capability the crawl pipeline is written against. Implementors
/// must be shareable across the detail-fetch pool.
pub trait Fetch: Sync {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Parsed robots.txt rules for one host.
struct CachedRobots {
    disallow: Vec<String>,
    allow: Vec<String>,
    fetched_at: Instant,
    ttl: Duration,
}

impl CachedRobots {
    fn parse(content: &str, user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        let mut disallow = Vec::new();
        let mut allow = Vec::new();
        let mut applies = false;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match directive.trim().to_lowercase().as_str() {
                "user-agent" => applies = value == "*" || ua.contains(&value.to_lowercase()),
                "disallow" if applies && !value.is_empty() => disallow.push(value.to_string()),
                "allow" if applies && !value.is_empty() => allow.push(value.to_string()),
                _ => {}
            }
        }

        Self {
            disallow,
            allow,
            fetched_at: Instant::now(),
            ttl: ROBOTS_TTL,
        }
    }

    fn allow_all() -> Self {
        Self {
            disallow: Vec::new(),
            allow: Vec::new(),
            fetched_at: Instant::now(),
            ttl: ROBOTS_FAILURE_TTL,
        }
    }

    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }

    /// Prefix match, longest pattern wins, allow wins ties.
    fn is_allowed(&self, path: &str) -> bool {
        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|pattern| path.starts_with(pattern.as_str()))
                .map(|pattern| pattern.len())
                .max()
                .unwrap_or(0)
        };
        longest(&self.allow) >= longest(&self.disallow)
    }
}

struct PolitenessState {
    last_request: Option<Instant>,
    throttle: Duration,
    robots: HashMap<String, CachedRobots>,
    cache: HashMap<String, (Instant, FetchResponse)>,
}

/// Blocking HTTP client wrapped in a politeness gate.
///
/// The gate mutex is held for the whole request, which is what serializes
/// in-flight requests; a run targets a single host, so one gate is one host.
pub struct PoliteClient {
    client: Client,
    state: Mutex<PolitenessState>,
}

impl PoliteClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            state: Mutex::new(PolitenessState {
                last_request: None,
                throttle: BASE_DELAY,
                robots: HashMap::new(),
                cache: HashMap::new(),
            }),
        })
    }

    fn robots_for(&self, state: &mut PolitenessState, url: &Url) -> Result<(), FetchError> {
        let host = url.host_str().unwrap_or_default().to_string();
        let needs_fetch = state
            .robots
            .get(&host)
            .map(|cached| !cached.is_fresh())
            .unwrap_or(true);

        if needs_fetch {
            let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);
            let cached = match self.client.get(&robots_url).send().and_then(|r| r.text()) {
                Ok(content) => CachedRobots::parse(&content, USER_AGENT),
                Err(err) => {
                    tracing::warn!(host, error = %err, "robots.txt fetch failed, allowing all");
                    CachedRobots::allow_all()
                }
            };
            state.robots.insert(host.clone(), cached);
        }

        let allowed = state
            .robots
            .get(&host)
            .map(|cached| cached.is_allowed(url.path()))
            .unwrap_or(true);
        if allowed {
            Ok(())
        } else {
            Err(FetchError::Disallowed(url.to_string()))
        }
    }
}

/// Randomizes a delay to 50-150% of its value.
fn jittered(delay: Duration) -> Duration {
    delay.mul_f64(rand::rng().random_range(0.5..=1.5))
}

/// Slides the inter-request delay toward the last observed latency, clamped
/// to the throttle bounds. Slow responses slow the crawl down.
fn next_throttle(current: Duration, latency: Duration) -> Duration {
    ((current + latency) / 2).clamp(MIN_THROTTLE, MAX_THROTTLE)
}

impl Fetch for PoliteClient {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let parsed = Url::parse(url)?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some((fetched_at, response)) = state.cache.get(url) {
            if fetched_at.elapsed() < CACHE_TTL {
                tracing::debug!(url, "serving cached response");
                return Ok(response.clone());
            }
        }

        self.robots_for(&mut state, &parsed)?;

        if let Some(last) = state.last_request {
            let wait = jittered(state.throttle);
            let elapsed = last.elapsed();
            if elapsed < wait {
                std::thread::sleep(wait - elapsed);
            }
        }

        let started = Instant::now();
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        let latency = started.elapsed();

        state.last_request = Some(Instant::now());
        state.throttle = next_throttle(state.throttle, latency);
        tracing::debug!(url, status, latency_ms = latency.as_millis() as u64, "fetched");

        let fetched = FetchResponse { status, body };
        state.cache.retain(|_, (at, _)| at.elapsed() < CACHE_TTL);
        if state.cache.len() < CACHE_CAPACITY {
            state
                .cache
                .insert(url.to_string(), (Instant::now(), fetched.clone()));
        }

        Ok(fetched)
    }
}
