//! Counting-semaphore gates: one per upstream for outbound fetches, and one
//! process-wide gate for whole searches.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{ApiError, FetchError};
use crate::types::Source;

/// Bounds concurrent outbound calls to one source. Every acquisition is
/// preceded by a random pacing delay.
#[derive(Debug, Clone)]
pub struct FetchGate {
    source: Source,
    semaphore: Arc<Semaphore>,
    acquire_timeout: Duration,
    pacing: (Duration, Duration),
}

/// Held for the duration of exactly one outbound call.
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
}

impl FetchGate {
    pub fn new(source: Source, config: &FetchConfig) -> Self {
        Self {
            source,
            semaphore: Arc::new(Semaphore::new(config.concurrency)),
            acquire_timeout: config.acquire_timeout,
            pacing: (config.pacing_min, config.pacing_max),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn pacing_delay(&self) -> Duration {
        let (min, max) = self.pacing;
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    /// Sleep for the pacing delay, then wait up to the acquire timeout for a
    /// slot.
    pub async fn acquire(&self) -> Result<FetchPermit, FetchError> {
        tokio::time::sleep(self.pacing_delay()).await;

        let acquired =
            tokio::time::timeout(self.acquire_timeout, self.semaphore.clone().acquire_owned())
                .await;
        match acquired {
            Ok(Ok(permit)) => {
                debug!(source = %self.source, available = self.available(), "fetch gate acquired");
                Ok(FetchPermit { _permit: permit })
            }
            // The semaphore is never closed; treat it like a timeout if it is.
            Ok(Err(_)) | Err(_) => {
                warn!(source = %self.source, waited = ?self.acquire_timeout, "fetch gate timed out");
                Err(FetchError::GateTimeout(self.source, self.acquire_timeout))
            }
        }
    }
}

/// Bounds concurrently executing searches. Never queues: a full gate rejects.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Released when the search finishes, whichever way it exits.
#[derive(Debug)]
pub struct SearchPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    pub fn try_enter(&self) -> Result<SearchPermit, ApiError> {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => Ok(SearchPermit { _permit: permit }),
            Err(_) => {
                warn!(capacity = self.capacity, "admission gate saturated, rejecting search");
                Err(ApiError::Overloaded)
            }
        }
    }
}
