//! Apply remote status reports to pending ledger records

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::{
    FailurePolicy, RemoteStatusReport, StatusSignal, TransactionRecord, TransactionStore,
    TxHash, TxStatus,
};

#[derive(Debug, Default)]
struct PassCounters {
    updated: usize,
    conflicts: usize,
    still_pending: usize,
    unresolved: usize,
    write_errors: usize,
    skipped_terminal: usize,
}

/// Merge status reports into pending records.
///
/// Each record whose hash resolves to a terminal signal gets one
/// compare-and-set from `pending`. Returns the number of rows actually
/// transitioned, so a second pass over the same snapshot returns 0.
pub fn reconcile<S>(
    store: &S,
    pending: &[TransactionRecord],
    reports: &HashMap<TxHash, RemoteStatusReport>,
    policy: FailurePolicy,
) -> usize
where
    S: TransactionStore + ?Sized,
{
    let mut counters = PassCounters::default();

    for record in pending {
        if record.transaction_status.is_terminal() {
            counters.skipped_terminal += 1;
            continue;
        }

        let signal = reports
            .get(&record.transaction_hash)
            .map(|report| report.signal(policy))
            .unwrap_or(StatusSignal::Unresolved);

        let Some(target) = signal.target_status() else {
            match signal {
                StatusSignal::Pending => counters.still_pending += 1,
                _ => counters.unresolved += 1,
            }
            continue;
        };

        match store.compare_and_set_status(record.id, TxStatus::Pending, target) {
            Ok(true) => {
                counters.updated += 1;
                debug!(
                    id = record.id,
                    hash = %record.transaction_hash,
                    status = %target,
                    "transaction settled"
                );
            }
            Ok(false) => {
                counters.conflicts += 1;
                debug!(
                    id = record.id,
                    hash = %record.transaction_hash,
                    "status already changed, skipping"
                );
            }
            Err(e) => {
                counters.write_errors += 1;
                warn!(
                    id = record.id,
                    hash = %record.transaction_hash,
                    error = %e,
                    "failed to update transaction status"
                );
            }
        }
    }

    info!(
        updated = counters.updated,
        conflicts = counters.conflicts,
        still_pending = counters.still_pending,
        unresolved = counters.unresolved,
        write_errors = counters.write_errors,
        skipped_terminal = counters.skipped_terminal,
        "reconcile pass complete"
    );

    counters.updated
}
