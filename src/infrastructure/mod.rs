//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - ABI loading from JSON documents and directories
//! - zkSync status lookups over alloy HTTP providers
//! - The Tokio sync loop that drives reconciliation

pub mod abi;
pub mod ethereum;
pub mod runtime;
