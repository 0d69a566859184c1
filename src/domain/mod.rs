//! Domain layer - pure types and rules, no I/O

pub mod abi;
pub mod ledger;
