//! Persistent storage

mod ledger;

pub use ledger::TransactionLedger;
