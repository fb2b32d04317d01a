//! Per-search crawl state and the orchestrator that runs both sources.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::fetcher::Fetcher;
use crate::normalize::{gap_check, passes_exclusion};
use crate::types::{Listing, SearchRequest, Source};
use crate::{kufar, onliner};

/// Why a source crawler stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The upstream had no further page.
    Exhausted,
    PageCap,
    /// The next page or token had already been visited.
    Cycle,
    /// Transport failure, undecodable body, or fetch gate timeout.
    FetchFailed,
    /// The landing page had no usable search form.
    EndpointMissing,
}

/// Why an item was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Promoted,
    /// Missing name, or missing/zero price.
    Malformed,
    Excluded,
    /// Outside the price range, or a price that does not parse.
    OutOfRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub promoted: usize,
    pub malformed: usize,
    pub excluded: usize,
    pub out_of_range: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.promoted + self.malformed + self.excluded + self.out_of_range
    }
}

/// Diagnostics for one source crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub source: Source,
    pub pages: usize,
    pub kept: usize,
    pub skipped: SkipCounts,
    pub stop: StopReason,
}

#[derive(Debug, Clone)]
pub struct SourceResult {
    pub listings: Vec<Listing>,
    pub stats: CrawlStats,
}

/// Mutable state of one source crawl: visited pages or tokens plus the
/// listings gathered so far. Built per call, consumed by [`CrawlState::finish`].
#[derive(Debug)]
pub struct CrawlState {
    source: Source,
    visited: HashSet<String>,
    listings: Vec<Listing>,
    pages: usize,
    skipped: SkipCounts,
}

impl CrawlState {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            visited: HashSet::new(),
            listings: Vec::new(),
            pages: 0,
            skipped: SkipCounts::default(),
        }
    }

    /// Records `key` as visited; false if it already was.
    pub fn visit(&mut self, key: &str) -> bool {
        self.visited.insert(key.to_string())
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn page_fetched(&mut self) {
        self.pages += 1;
    }

    pub fn skip(&mut self, reason: Skip) {
        match reason {
            Skip::Promoted => self.skipped.promoted += 1,
            Skip::Malformed => self.skipped.malformed += 1,
            Skip::Excluded => self.skipped.excluded += 1,
            Skip::OutOfRange => self.skipped.out_of_range += 1,
        }
    }

    pub fn push(&mut self, name: String, price: String, item_url: String) {
        self.listings.push(Listing {
            name,
            price,
            item_url,
            source: self.source,
        });
    }

    pub fn finish(self, stop: StopReason) -> SourceResult {
        let stats = CrawlStats {
            source: self.source,
            pages: self.pages,
            kept: self.listings.len(),
            skipped: self.skipped,
            stop,
        };
        info!(
            source = %stats.source,
            pages = stats.pages,
            kept = stats.kept,
            skipped = stats.skipped.total(),
            promoted = stats.skipped.promoted,
            malformed = stats.skipped.malformed,
            stop = ?stats.stop,
            "source crawl finished"
        );
        SourceResult {
            listings: self.listings,
            stats,
        }
    }
}

/// Exclusion and price-range filters, in that order.
pub fn screen(request: &SearchRequest, name: &str, price: &str) -> Option<Skip> {
    if !passes_exclusion(name, &request.excluded_words) {
        return Some(Skip::Excluded);
    }
    if !gap_check(price, request.min_price, request.max_price) {
        return Some(Skip::OutOfRange);
    }
    None
}

#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Onliner listings first, then Kufar, each in page order.
    pub listings: Vec<Listing>,
    pub stats: Vec<CrawlStats>,
}

/// Runs both source crawlers for a search and merges their output.
#[derive(Debug, Clone)]
pub struct Crawler {
    fetcher: Arc<Fetcher>,
    config: Arc<CrawlConfig>,
}

impl Crawler {
    pub fn new(fetcher: Arc<Fetcher>, config: CrawlConfig) -> Self {
        Self {
            fetcher,
            config: Arc::new(config),
        }
    }

    /// Both sources run on their own tasks. A task that panics contributes
    /// nothing; the search fails only when every source faulted.
    pub async fn crawl(&self, request: &SearchRequest) -> Result<CrawlOutcome, CrawlError> {
        let request = Arc::new(request.clone());

        let onliner_task = {
            let (fetcher, config, request) =
                (self.fetcher.clone(), self.config.clone(), request.clone());
            tokio::spawn(async move { onliner::crawl(&fetcher, &config, &request).await })
        };
        let kufar_task = {
            let (fetcher, config, request) =
                (self.fetcher.clone(), self.config.clone(), request.clone());
            tokio::spawn(async move { kufar::crawl(&fetcher, &config, &request).await })
        };
        let (onliner_joined, kufar_joined) = tokio::join!(onliner_task, kufar_task);

        let mut outcome = CrawlOutcome::default();
        let mut faults = Vec::new();
        for (source, joined) in [(Source::Onliner, onliner_joined), (Source::Kufar, kufar_joined)] {
            match joined {
                Ok(result) => {
                    outcome.listings.extend(result.listings);
                    outcome.stats.push(result.stats);
                }
                Err(e) => {
                    error!(source = %source, error = %e, "source crawler faulted");
                    faults.push(format!("{}: {}", source, e));
                }
            }
        }

        if outcome.stats.is_empty() {
            return Err(CrawlError::AllSourcesFailed(faults.join("; ")));
        }
        Ok(outcome)
    }
}
