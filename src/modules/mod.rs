//! Command modules
//!
//! - toolkit: selector, decode and encode commands
//! - export: table, CSV and JSON rendering of ledger records

pub mod export;
pub mod toolkit;
