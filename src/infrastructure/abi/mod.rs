//! ABI infrastructure - loading ABI JSON from disk and the embedded contract

mod loader;

pub use loader::{AbiLoadError, AbiLoader, ScanReport};
