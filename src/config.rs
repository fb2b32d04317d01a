//! Runtime configuration, read once from the environment at start-up.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ONLINER_URL: &str = "https://baraholka.onliner.by/";
pub const DEFAULT_KUFAR_API_URL: &str =
    "https://api.kufar.by/search-api/v2/search/rendered-paginated";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub http_timeout: Duration,
    pub max_concurrent_searches: usize,
    pub crawl: CrawlConfig,
    pub fetch: FetchConfig,
}

/// Upstream locations and the pagination cap shared by both crawlers.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub onliner_url: Url,
    pub kufar_api_url: Url,
    pub max_pages: usize,
}

/// Per-source fetch gate settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Concurrent outbound calls allowed against each source.
    pub concurrency: usize,
    pub acquire_timeout: Duration,
    pub pacing_min: Duration,
    pub pacing_max: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            onliner_url: Url::parse(DEFAULT_ONLINER_URL).expect("valid default URL"),
            kufar_api_url: Url::parse(DEFAULT_KUFAR_API_URL).expect("valid default URL"),
            max_pages: 10,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            acquire_timeout: Duration::from_secs(5),
            pacing_min: Duration::from_millis(500),
            pacing_max: Duration::from_millis(1200),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            http_timeout: Duration::from_secs(30),
            max_concurrent_searches: 4,
            crawl: CrawlConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let onliner_url = match env::var("ONLINER_URL") {
            Ok(raw) => Url::parse(&raw).with_context(|| format!("invalid ONLINER_URL '{}'", raw))?,
            Err(_) => defaults.crawl.onliner_url,
        };
        let kufar_api_url = match env::var("KUFAR_API_URL") {
            Ok(raw) => {
                Url::parse(&raw).with_context(|| format!("invalid KUFAR_API_URL '{}'", raw))?
            }
            Err(_) => defaults.crawl.kufar_api_url,
        };

        let config = Config {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            http_timeout: Duration::from_secs(env_or("HTTP_TIMEOUT_SECS", 30)?),
            max_concurrent_searches: env_or("MAX_CONCURRENT_SEARCHES", defaults.max_concurrent_searches)?,
            crawl: CrawlConfig {
                onliner_url,
                kufar_api_url,
                max_pages: env_or("MAX_PAGES", defaults.crawl.max_pages)?,
            },
            fetch: FetchConfig {
                concurrency: env_or("FETCH_CONCURRENCY", defaults.fetch.concurrency)?,
                acquire_timeout: Duration::from_millis(env_or("FETCH_ACQUIRE_TIMEOUT_MS", 5000)?),
                pacing_min: Duration::from_millis(env_or("FETCH_PACING_MIN_MS", 500)?),
                pacing_max: Duration::from_millis(env_or("FETCH_PACING_MAX_MS", 1200)?),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_searches == 0 {
            return Err(anyhow!("MAX_CONCURRENT_SEARCHES must be at least 1"));
        }
        if self.fetch.concurrency == 0 {
            return Err(anyhow!("FETCH_CONCURRENCY must be at least 1"));
        }
        if self.fetch.pacing_min > self.fetch.pacing_max {
            return Err(anyhow!(
                "FETCH_PACING_MIN_MS ({:?}) exceeds FETCH_PACING_MAX_MS ({:?})",
                self.fetch.pacing_min,
                self.fetch.pacing_max
            ));
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {} '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}
