//! rampwatch: Orchestrator calldata decoding and transaction status
//! reconciliation for the on/off-ramp ledger.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod modules;
pub mod store;
