//! Ethereum infrastructure - remote status lookups over alloy providers

mod poller;
mod status_source;

pub use poller::StatusPoller;
pub use status_source::{parse_status_details, StatusSource, ZkSyncStatusSource, DEFAULT_ZKSYNC_RPC};
