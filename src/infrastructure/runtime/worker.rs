//! Sync worker - load pending records, poll their status, reconcile

use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::domain::ledger::{reconcile, FailurePolicy, TransactionStore, TxHash};
use crate::infrastructure::ethereum::StatusPoller;

/// Which pending records a sweep covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    All,
    Wallet(Address),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Pending records examined
    pub checked: usize,
    /// Records moved to a terminal status
    pub updated: usize,
}

pub struct SyncWorker {
    poller: StatusPoller,
    policy: FailurePolicy,
}

impl SyncWorker {
    pub fn new(poller: StatusPoller, policy: FailurePolicy) -> Self {
        Self { poller, policy }
    }

    /// One sweep. Only loading the pending set can fail; lookup and write
    /// failures are per record and leave it pending.
    pub async fn sync_once<S>(&self, store: &S, scope: SyncScope) -> Result<SyncReport>
    where
        S: TransactionStore + ?Sized,
    {
        let pending = match scope {
            SyncScope::All => store.get_pending_records(),
            SyncScope::Wallet(wallet) => store.get_pending_records_for_wallet(wallet),
        }
        .context("load pending transactions")?;

        if pending.is_empty() {
            return Ok(SyncReport::default());
        }

        let hashes: Vec<TxHash> = pending.iter().map(|r| r.transaction_hash).collect();
        let reports = self.poller.poll(&hashes).await;
        let updated = reconcile(store, &pending, &reports, self.policy);

        Ok(SyncReport {
            checked: pending.len(),
            updated,
        })
    }

    /// Sweep every `period` until `shutdown` flips to true or its sender is
    /// dropped. A failed sweep is logged and retried on the next tick.
    pub async fn run<S>(
        &self,
        store: &S,
        scope: SyncScope,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()>
    where
        S: TransactionStore + ?Sized,
    {
        info!(
            endpoint = %self.poller.endpoint_name(),
            period_secs = period.as_secs(),
            "sync loop started"
        );
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.sync_once(store, scope).await {
                        Ok(report) => info!(
                            checked = report.checked,
                            updated = report.updated,
                            "sync sweep finished"
                        ),
                        Err(e) => warn!(error = %format!("{e:#}"), "sync sweep failed"),
                    }
                }
            }
        }

        info!("sync loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use alloy_primitives::B256;

    use super::*;
    use crate::domain::ledger::{LookupError, RemoteStatus, TxStatus, TxType};
    use crate::infrastructure::ethereum::StatusSource;
    use crate::store::TransactionLedger;

    struct FixedSource(HashMap<TxHash, RemoteStatus>);

    #[async_trait::async_trait]
    impl StatusSource for FixedSource {
        async fn transaction_status(&self, hash: TxHash) -> Result<RemoteStatus, LookupError> {
            self.0
                .get(&hash)
                .copied()
                .ok_or_else(|| LookupError::Transport("connection refused".to_string()))
        }

        fn endpoint_name(&self) -> String {
            "fixed".to_string()
        }
    }

    fn worker(statuses: Vec<(TxHash, RemoteStatus)>) -> SyncWorker {
        let source = Arc::new(FixedSource(statuses.into_iter().collect()));
        let poller = StatusPoller::new(source, Duration::from_secs(5), 2);
        SyncWorker::new(poller, FailurePolicy::default())
    }

    #[tokio::test]
    async fn test_sync_once_scoped_to_wallet() {
        let ledger = TransactionLedger::open_in_memory().unwrap();
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);
        let a = ledger.insert_transaction(alice, B256::repeat_byte(1), TxType::Onramp).unwrap();
        let b = ledger.insert_transaction(bob, B256::repeat_byte(2), TxType::Offramp).unwrap();

        let worker = worker(vec![
            (a.transaction_hash, RemoteStatus::Verified),
            (b.transaction_hash, RemoteStatus::Verified),
        ]);

        let report = worker.sync_once(&ledger, SyncScope::Wallet(alice)).await.unwrap();
        assert_eq!(report, SyncReport { checked: 1, updated: 1 });
        assert_eq!(
            ledger.get_by_hash(b.transaction_hash).unwrap().unwrap().transaction_status,
            TxStatus::Pending
        );

        let report = worker.sync_once(&ledger, SyncScope::All).await.unwrap();
        assert_eq!(report, SyncReport { checked: 1, updated: 1 });

        let report = worker.sync_once(&ledger, SyncScope::All).await.unwrap();
        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let ledger = TransactionLedger::open_in_memory().unwrap();
        let record = ledger
            .insert_transaction(Address::repeat_byte(0xa1), B256::repeat_byte(5), TxType::Register)
            .unwrap();
        let worker = worker(vec![(record.transaction_hash, RemoteStatus::Verified)]);
        let (tx, rx) = watch::channel(false);

        let stopper = async {
            tokio::time::sleep(Duration::from_secs(45)).await;
            tx.send(true).unwrap();
        };
        let (result, ()) = tokio::join!(
            worker.run(&ledger, SyncScope::All, Duration::from_secs(30), rx),
            stopper
        );

        result.unwrap();
        assert_eq!(
            ledger.get_by_hash(record.transaction_hash).unwrap().unwrap().transaction_status,
            TxStatus::Success
        );
    }
}
