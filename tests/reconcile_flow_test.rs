//! Ledger + poller + reconciler against a scripted status source

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{address, Address, B256};

use rampwatch::domain::ledger::{
    reconcile, FailurePolicy, LookupError, RemoteStatus, TransactionStore, TxHash, TxStatus,
    TxType,
};
use rampwatch::infrastructure::ethereum::{StatusPoller, StatusSource};
use rampwatch::infrastructure::runtime::{SyncReport, SyncScope, SyncWorker};
use rampwatch::store::TransactionLedger;

#[derive(Clone, Copy)]
enum Reply {
    Status(RemoteStatus),
    Hang,
    Error,
}

#[derive(Default)]
struct ScriptedNode {
    replies: Mutex<HashMap<TxHash, Reply>>,
    calls: AtomicUsize,
}

impl ScriptedNode {
    fn set(&self, hash: TxHash, reply: Reply) {
        self.replies.lock().unwrap().insert(hash, reply);
    }
}

#[async_trait::async_trait]
impl StatusSource for ScriptedNode {
    async fn transaction_status(&self, hash: TxHash) -> Result<RemoteStatus, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().get(&hash).copied();
        match reply {
            Some(Reply::Status(status)) => Ok(status),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(RemoteStatus::Verified)
            }
            Some(Reply::Error) => Err(LookupError::Transport("HTTP 503".to_string())),
            None => Ok(RemoteStatus::Unknown),
        }
    }

    fn endpoint_name(&self) -> String {
        "scripted-node".to_string()
    }
}

struct TempLedger {
    path: PathBuf,
    ledger: TransactionLedger,
}

impl TempLedger {
    fn new(tag: &str) -> Self {
        let mut path = std::env::temp_dir();
        path.push(format!("rampwatch_{}_{}.db", tag, std::process::id()));
        let _ = std::fs::remove_file(&path);
        let ledger = TransactionLedger::open(&path).unwrap();
        Self { path, ledger }
    }
}

impl Drop for TempLedger {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn worker(node: Arc<ScriptedNode>, policy: FailurePolicy) -> SyncWorker {
    SyncWorker::new(StatusPoller::new(node, Duration::from_secs(10), 4), policy)
}

fn status_of(ledger: &TransactionLedger, hash: TxHash) -> TxStatus {
    ledger.get_by_hash(hash).unwrap().unwrap().transaction_status
}

const WALLET: Address = address!("a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7");

#[tokio::test]
async fn test_verified_hash_becomes_success() {
    let temp = TempLedger::new("verified");
    let record = temp
        .ledger
        .insert_transaction(WALLET, B256::repeat_byte(1), TxType::Register)
        .unwrap();

    let node = Arc::new(ScriptedNode::default());
    node.set(record.transaction_hash, Reply::Status(RemoteStatus::Verified));

    let report = worker(node, FailurePolicy::default())
        .sync_once(&temp.ledger, SyncScope::All)
        .await
        .unwrap();

    assert_eq!(report, SyncReport { checked: 1, updated: 1 });
    assert_eq!(status_of(&temp.ledger, record.transaction_hash), TxStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_leaves_only_that_record_pending() {
    let temp = TempLedger::new("timeout");
    let fast = temp
        .ledger
        .insert_transaction(WALLET, B256::repeat_byte(1), TxType::Onramp)
        .unwrap();
    let slow = temp
        .ledger
        .insert_transaction(WALLET, B256::repeat_byte(2), TxType::Onramp)
        .unwrap();

    let node = Arc::new(ScriptedNode::default());
    node.set(fast.transaction_hash, Reply::Status(RemoteStatus::Verified));
    node.set(slow.transaction_hash, Reply::Hang);

    let report = worker(node, FailurePolicy::default())
        .sync_once(&temp.ledger, SyncScope::All)
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(status_of(&temp.ledger, fast.transaction_hash), TxStatus::Success);
    assert_eq!(status_of(&temp.ledger, slow.transaction_hash), TxStatus::Pending);
}

#[tokio::test]
async fn test_second_reconcile_with_same_snapshot_updates_nothing() {
    let temp = TempLedger::new("idempotent");
    for byte in 1..=3u8 {
        temp.ledger
            .insert_transaction(WALLET, B256::repeat_byte(byte), TxType::Offramp)
            .unwrap();
    }
    let node = Arc::new(ScriptedNode::default());
    node.set(B256::repeat_byte(1), Reply::Status(RemoteStatus::Verified));
    node.set(B256::repeat_byte(2), Reply::Status(RemoteStatus::Included));
    node.set(B256::repeat_byte(3), Reply::Error);

    let snapshot = temp.ledger.get_pending_records().unwrap();
    let hashes: Vec<TxHash> = snapshot.iter().map(|r| r.transaction_hash).collect();
    let poller = StatusPoller::new(node, Duration::from_secs(10), 2);
    let reports = poller.poll(&hashes).await;

    assert_eq!(reconcile(&temp.ledger, &snapshot, &reports, FailurePolicy::default()), 1);
    assert_eq!(reconcile(&temp.ledger, &snapshot, &reports, FailurePolicy::default()), 0);
    assert_eq!(temp.ledger.get_pending_records().unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_sweeps_transition_once() {
    let temp = TempLedger::new("overlap");
    let other = Address::repeat_byte(0x0b);
    let mine = temp
        .ledger
        .insert_transaction(WALLET, B256::repeat_byte(1), TxType::Onramp)
        .unwrap();
    temp.ledger
        .insert_transaction(other, B256::repeat_byte(2), TxType::Onramp)
        .unwrap();

    let node = Arc::new(ScriptedNode::default());
    node.set(B256::repeat_byte(1), Reply::Status(RemoteStatus::Verified));
    node.set(B256::repeat_byte(2), Reply::Status(RemoteStatus::Verified));

    // Both sweeps read their snapshot before either writes.
    let global = temp.ledger.get_pending_records().unwrap();
    let scoped = temp.ledger.get_pending_records_for_wallet(WALLET).unwrap();
    let poller = StatusPoller::new(node, Duration::from_secs(10), 4);
    let global_reports = poller.poll(&global.iter().map(|r| r.transaction_hash).collect::<Vec<_>>()).await;
    let scoped_reports = poller.poll(&[mine.transaction_hash]).await;

    let policy = FailurePolicy::default();
    let first = reconcile(&temp.ledger, &scoped, &scoped_reports, policy);
    let second = reconcile(&temp.ledger, &global, &global_reports, policy);

    assert_eq!(first, 1);
    assert_eq!(second, 1);
}

#[tokio::test]
async fn test_terminal_records_are_never_revisited() {
    let temp = TempLedger::new("monotonic");
    let record = temp
        .ledger
        .insert_transaction(WALLET, B256::repeat_byte(9), TxType::Offramp)
        .unwrap();
    let node = Arc::new(ScriptedNode::default());

    node.set(record.transaction_hash, Reply::Status(RemoteStatus::Failed));
    let settle_failures = worker(node.clone(), FailurePolicy::MarkFailed);
    settle_failures.sync_once(&temp.ledger, SyncScope::All).await.unwrap();
    assert_eq!(status_of(&temp.ledger, record.transaction_hash), TxStatus::Failed);

    // The node changes its mind; the record is no longer pending so it is
    // not even looked up.
    node.set(record.transaction_hash, Reply::Status(RemoteStatus::Verified));
    let calls_before = node.calls.load(Ordering::SeqCst);
    let report = settle_failures.sync_once(&temp.ledger, SyncScope::All).await.unwrap();

    assert_eq!(report, SyncReport::default());
    assert_eq!(node.calls.load(Ordering::SeqCst), calls_before);
    assert_eq!(status_of(&temp.ledger, record.transaction_hash), TxStatus::Failed);
}

#[tokio::test]
async fn test_remote_failure_left_pending_by_default() {
    let temp = TempLedger::new("default_policy");
    let record = temp
        .ledger
        .insert_transaction(WALLET, B256::repeat_byte(4), TxType::Register)
        .unwrap();
    let node = Arc::new(ScriptedNode::default());
    node.set(record.transaction_hash, Reply::Status(RemoteStatus::Failed));

    let report = worker(node, FailurePolicy::default())
        .sync_once(&temp.ledger, SyncScope::Wallet(WALLET))
        .await
        .unwrap();

    assert_eq!(report, SyncReport { checked: 1, updated: 0 });
    assert_eq!(status_of(&temp.ledger, record.transaction_hash), TxStatus::Pending);
}
