//! Remote status vocabulary and its mapping onto local signals

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::TxStatus;

/// Status strings reported by the chain endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteStatus {
    Pending,
    Included,
    Verified,
    Failed,
    Unknown,
}

impl RemoteStatus {
    pub const ALL: [RemoteStatus; 5] = [
        Self::Pending,
        Self::Included,
        Self::Verified,
        Self::Failed,
        Self::Unknown,
    ];

    /// Case-insensitive; anything unrecognised is `Unknown`
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "included" => Self::Included,
            "verified" => Self::Verified,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Included => "included",
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn signal(self, policy: FailurePolicy) -> StatusSignal {
        match (self, policy) {
            (Self::Pending | Self::Included, _) => StatusSignal::Pending,
            (Self::Verified, _) => StatusSignal::Success,
            (Self::Failed, FailurePolicy::MarkFailed) => StatusSignal::Failed,
            (Self::Failed, FailurePolicy::LeaveUnresolved) | (Self::Unknown, _) => {
                StatusSignal::Unresolved
            }
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a remote `failed` status.
///
/// The default leaves such records unresolved so they are retried on the
/// next pass; `MarkFailed` settles them as `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    LeaveUnresolved,
    MarkFailed,
}

impl FailurePolicy {
    pub fn from_settle_flag(settle_remote_failures: bool) -> Self {
        if settle_remote_failures {
            Self::MarkFailed
        } else {
            Self::LeaveUnresolved
        }
    }
}

/// Local view of a remote status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusSignal {
    Pending,
    Success,
    Failed,
    /// No usable answer; never written back
    Unresolved,
}

impl StatusSignal {
    /// Terminal status this signal settles a pending record into, if any
    pub fn target_status(self) -> Option<TxStatus> {
        match self {
            Self::Success => Some(TxStatus::Success),
            Self::Failed => Some(TxStatus::Failed),
            Self::Pending | Self::Unresolved => None,
        }
    }
}

/// Why a single status lookup produced no answer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Outcome of looking up one transaction hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatusReport {
    Reported(RemoteStatus),
    LookupFailed(LookupError),
}

impl RemoteStatusReport {
    pub fn signal(&self, policy: FailurePolicy) -> StatusSignal {
        match self {
            Self::Reported(status) => status.signal(policy),
            Self::LookupFailed(_) => StatusSignal::Unresolved,
        }
    }
}
