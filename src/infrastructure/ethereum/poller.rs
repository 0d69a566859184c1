//! Status poller - fans out one lookup per hash with bounded parallelism

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::StatusSource;
use crate::domain::ledger::{LookupError, RemoteStatusReport, TxHash};

pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    timeout: Duration,
    max_concurrent: usize,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn StatusSource>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            source,
            timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn endpoint_name(&self) -> String {
        self.source.endpoint_name()
    }

    /// Look up every distinct hash. Every input hash gets a report; a failed
    /// or timed-out lookup becomes `LookupFailed` for that hash only.
    pub async fn poll(&self, hashes: &[TxHash]) -> HashMap<TxHash, RemoteStatusReport> {
        let mut seen = HashSet::with_capacity(hashes.len());
        let unique: Vec<TxHash> = hashes.iter().copied().filter(|h| seen.insert(*h)).collect();

        stream::iter(unique)
            .map(|hash| async move { (hash, self.lookup(hash).await) })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }

    async fn lookup(&self, hash: TxHash) -> RemoteStatusReport {
        let result = match tokio::time::timeout(self.timeout, self.source.transaction_status(hash))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(self.timeout)),
        };

        match result {
            Ok(status) => {
                debug!(hash = %hash, status = %status, "status lookup");
                RemoteStatusReport::Reported(status)
            }
            Err(e) => {
                warn!(hash = %hash, error = %e, "status lookup failed");
                RemoteStatusReport::LookupFailed(e)
            }
        }
    }
}
