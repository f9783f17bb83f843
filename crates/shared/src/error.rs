use std::fmt;

use serde::{Deserialize, Serialize};

/// User-facing failure categories of a wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConfigFetch,
    SdkConstruction,
    AccountDiscovery,
    ContractRead,
    TransferSubmission,
    InvalidInput,
    Storage,
}

/// What a presentation layer should offer after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryAction {
    Connect,
    LoadBalance,
    SubmitTransfer,
    None,
}

impl FailureKind {
    pub fn retry_action(self) -> RetryAction {
        match self {
            FailureKind::ConfigFetch | FailureKind::SdkConstruction | FailureKind::AccountDiscovery => {
                RetryAction::Connect
            }
            FailureKind::ContractRead => RetryAction::LoadBalance,
            FailureKind::TransferSubmission => RetryAction::SubmitTransfer,
            FailureKind::InvalidInput | FailureKind::Storage => RetryAction::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureKind::ConfigFetch => "network config unavailable",
            FailureKind::SdkConstruction => "network config rejected",
            FailureKind::AccountDiscovery => "no wallet account",
            FailureKind::ContractRead => "token read failed",
            FailureKind::TransferSubmission => "transfer failed",
            FailureKind::InvalidInput => "invalid input",
            FailureKind::Storage => "local storage error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SessionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn retry_action(&self) -> RetryAction {
        self.kind.retry_action()
    }
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_phase_failures_offer_reconnect() {
        for kind in [
            FailureKind::ConfigFetch,
            FailureKind::SdkConstruction,
            FailureKind::AccountDiscovery,
        ] {
            assert_eq!(kind.retry_action(), RetryAction::Connect);
        }
        assert_eq!(
            FailureKind::ContractRead.retry_action(),
            RetryAction::LoadBalance
        );
        assert_eq!(FailureKind::InvalidInput.retry_action(), RetryAction::None);
    }

    #[test]
    fn failure_serializes_kind_in_snake_case() {
        let failure = SessionFailure::new(FailureKind::ConfigFetch, "timed out");
        let json = serde_json::to_value(&failure).expect("json");
        assert_eq!(json["kind"], "config_fetch");
        assert_eq!(failure.to_string(), "network config unavailable: timed out");
    }
}
