use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::gate::FetchGate;
use crate::transport::{FetchedPage, Transport};
use crate::types::Source;

/// Routes every outbound call through the gate of the source it targets.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    onliner_gate: FetchGate,
    kufar_gate: FetchGate,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, config: &FetchConfig) -> Self {
        Self {
            transport,
            onliner_gate: FetchGate::new(Source::Onliner, config),
            kufar_gate: FetchGate::new(Source::Kufar, config),
        }
    }

    pub fn gate(&self, source: Source) -> &FetchGate {
        match source {
            Source::Onliner => &self.onliner_gate,
            Source::Kufar => &self.kufar_gate,
        }
    }

    /// One paced, gated GET. The gate slot is released when this returns.
    pub async fn fetch(&self, source: Source, url: &Url) -> Result<FetchedPage, FetchError> {
        let _permit = self.gate(source).acquire().await?;

        match self.transport.get(url).await {
            Ok(page) => {
                info!(source = %source, method = "GET", url = %url, status = page.status, "HTTP GET");
                Ok(page)
            }
            Err(e) => {
                warn!(source = %source, method = "GET", url = %url, error = %e, "request failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("onliner_gate", &self.onliner_gate)
            .field("kufar_gate", &self.kufar_gate)
            .finish_non_exhaustive()
    }
}
