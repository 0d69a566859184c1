//! Remote transaction status lookups
//!
//! zkSync Era exposes the settlement stage of a transaction through the
//! `zks_getTransactionDetails` JSON-RPC method; the stage string lives at
//! `result.status`.

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::{Context, Result};
use serde_json::Value;

use crate::domain::ledger::{LookupError, RemoteStatus, TxHash};

pub const DEFAULT_ZKSYNC_RPC: &str = "https://sepolia.era.zksync.dev";

/// One status lookup per transaction hash
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync + 'static {
    async fn transaction_status(&self, hash: TxHash) -> Result<RemoteStatus, LookupError>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

/// HTTP JSON-RPC status source for zkSync Era nodes
pub struct ZkSyncStatusSource {
    provider: DynProvider,
    endpoint: String,
}

impl ZkSyncStatusSource {
    pub fn connect_http(url: &str) -> Result<Self> {
        let rpc_url = url.parse().context("Invalid HTTP URL")?;
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
        Ok(Self {
            provider,
            endpoint: url.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl StatusSource for ZkSyncStatusSource {
    async fn transaction_status(&self, hash: TxHash) -> Result<RemoteStatus, LookupError> {
        let details: Value = self
            .provider
            .raw_request("zks_getTransactionDetails".into(), (hash,))
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        parse_status_details(&details)
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }
}

/// Extract the status from a `zks_getTransactionDetails` result.
///
/// A null result (hash not known to the node) or a missing `status` field is
/// `Unknown`; a `status` that is not a string is an invalid response.
pub fn parse_status_details(details: &Value) -> Result<RemoteStatus, LookupError> {
    match details.get("status") {
        None | Some(Value::Null) => Ok(RemoteStatus::Unknown),
        Some(Value::String(status)) => Ok(RemoteStatus::parse(status)),
        Some(other) => Err(LookupError::InvalidResponse(format!(
            "status field is not a string: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_status_details() {
        let details = json!({
            "isL1Originated": false,
            "status": "Verified",
            "fee": "0x1c6bf52634000",
            "initiatorAddress": "0xa75da6945ca2311ac81165fc38706a1d612639af",
            "receivedAt": "2024-05-14T09:12:44.093Z",
            "ethCommitTxHash": null
        });
        assert_eq!(parse_status_details(&details).unwrap(), RemoteStatus::Verified);

        assert_eq!(
            parse_status_details(&json!({"status": "included"})).unwrap(),
            RemoteStatus::Included
        );
        assert_eq!(
            parse_status_details(&json!({"status": "rejected"})).unwrap(),
            RemoteStatus::Unknown
        );
    }

    #[test]
    fn test_missing_status_is_unknown() {
        assert_eq!(parse_status_details(&Value::Null).unwrap(), RemoteStatus::Unknown);
        assert_eq!(parse_status_details(&json!({})).unwrap(), RemoteStatus::Unknown);
        assert!(matches!(
            parse_status_details(&json!({"status": 3})),
            Err(LookupError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        assert!(ZkSyncStatusSource::connect_http("not a url").is_err());
        let source = ZkSyncStatusSource::connect_http(DEFAULT_ZKSYNC_RPC).unwrap();
        assert_eq!(source.endpoint_name(), DEFAULT_ZKSYNC_RPC);
    }
}
