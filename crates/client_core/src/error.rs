use shared::error::{FailureKind, SessionFailure};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to fetch network config: {0:#}")]
    ConfigFetch(anyhow::Error),
    #[error("failed to construct chain clients: {0:#}")]
    SdkConstruction(anyhow::Error),
    #[error("failed to discover wallet account: {0:#}")]
    AccountDiscovery(anyhow::Error),
    #[error("failed to read token contract: {0:#}")]
    ContractRead(anyhow::Error),
    #[error("failed to submit transfer: {0:#}")]
    TransferSubmission(anyhow::Error),
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("session storage failed: {0:#}")]
    Storage(anyhow::Error),
    #[error("token decimals are not loaded yet")]
    DecimalsUnknown,
    #[error("wallet session is not connected")]
    NotConnected,
    #[error("operation superseded by a newer session change")]
    Superseded,
}

impl SessionError {
    /// Category shown to the user; `None` for control-flow outcomes.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            SessionError::ConfigFetch(_) => Some(FailureKind::ConfigFetch),
            SessionError::SdkConstruction(_) => Some(FailureKind::SdkConstruction),
            SessionError::AccountDiscovery(_) => Some(FailureKind::AccountDiscovery),
            SessionError::ContractRead(_) | SessionError::DecimalsUnknown => {
                Some(FailureKind::ContractRead)
            }
            SessionError::TransferSubmission(_) => Some(FailureKind::TransferSubmission),
            SessionError::InvalidInput { .. } => Some(FailureKind::InvalidInput),
            SessionError::Storage(_) => Some(FailureKind::Storage),
            SessionError::NotConnected | SessionError::Superseded => None,
        }
    }

    pub fn to_failure(&self) -> Option<SessionFailure> {
        self.kind()
            .map(|kind| SessionFailure::new(kind, self.to_string()))
    }
}
