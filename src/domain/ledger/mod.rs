//! Transaction ledger domain: records, remote status vocabulary and the
//! reconciliation rules that move records out of `pending`.

mod reconciler;
mod status;

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, B256};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use reconciler::reconcile;
pub use status::{FailurePolicy, LookupError, RemoteStatus, RemoteStatusReport, StatusSignal};

/// Chain transaction identifier
pub type TxHash = B256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {field} `{value}`")]
pub struct ParseFieldError {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    Register,
    Onramp,
    Offramp,
}

impl TxType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Onramp => "onramp",
            Self::Offramp => "offramp",
        }
    }
}

impl FromStr for TxType {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "register" => Ok(Self::Register),
            "onramp" => Ok(Self::Onramp),
            "offramp" => Ok(Self::Offramp),
            _ => Err(ParseFieldError {
                field: "transaction type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Local transaction status. `Success` and `Failed` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Only pending -> success and pending -> failed are legal
    pub fn can_transition_to(self, next: TxStatus) -> bool {
        self == Self::Pending && next.is_terminal()
    }
}

impl FromStr for TxStatus {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseFieldError {
                field: "transaction status",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A recorded transaction, owned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Store-assigned identity
    pub id: i64,
    pub wallet_address: Address,
    pub transaction_hash: TxHash,
    pub transaction_type: TxType,
    pub transaction_status: TxStatus,
    pub created_at: DateTime<Utc>,
}

/// The persistent store, as seen by the reconciler
pub trait TransactionStore {
    /// All records whose status is `pending`
    fn get_pending_records(&self) -> anyhow::Result<Vec<TransactionRecord>>;

    /// Pending records belonging to one wallet
    fn get_pending_records_for_wallet(
        &self,
        wallet: Address,
    ) -> anyhow::Result<Vec<TransactionRecord>>;

    /// Set `new` only if the stored status still equals `expected`.
    ///
    /// Returns `Ok(false)` when the guard did not match (another pass got
    /// there first, or the id is gone).
    fn compare_and_set_status(
        &self,
        id: i64,
        expected: TxStatus,
        new: TxStatus,
    ) -> anyhow::Result<bool>;
}
