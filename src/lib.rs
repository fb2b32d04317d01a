pub mod config;
pub mod crawl;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod gate;
pub mod kufar;
pub mod normalize;
pub mod onliner;
pub mod server;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::config::Config;
use crate::crawl::Crawler;
use crate::fetcher::Fetcher;
use crate::gate::AdmissionGate;
use crate::transport::Transport;

#[derive(Clone, Debug)]
pub struct AppState {
    pub crawler: Crawler,
    // Bounds whole searches; the per-source fetch gates live in the crawler
    pub admission: AdmissionGate,
}

pub use types::*;

impl AppState {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let fetcher = Arc::new(Fetcher::new(transport, &config.fetch));
        Self {
            crawler: Crawler::new(fetcher, config.crawl.clone()),
            admission: AdmissionGate::new(config.max_concurrent_searches),
        }
    }
}
