//! Runtime infrastructure - periodic status sync on the Tokio runtime

mod worker;

pub use worker::{SyncReport, SyncScope, SyncWorker};
