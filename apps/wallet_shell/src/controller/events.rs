//! Backend-to-shell events and error modeling.

use client_core::{SessionEvent, SessionSnapshot};
use shared::error::{FailureKind, RetryAction, SessionFailure};

pub enum UiEvent {
    Info(String),
    Session(SessionEvent),
    Snapshot(SessionSnapshot),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Network,
    Configuration,
    Wallet,
    Contract,
    Transaction,
    Validation,
    Storage,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Connect,
    Balance,
    Transfer,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
    retry: RetryAction,
}

impl UiError {
    pub fn from_failure(failure: &SessionFailure) -> Self {
        let (category, context) = match failure.kind {
            FailureKind::ConfigFetch => (UiErrorCategory::Network, UiErrorContext::Connect),
            FailureKind::SdkConstruction => {
                (UiErrorCategory::Configuration, UiErrorContext::Connect)
            }
            FailureKind::AccountDiscovery => (UiErrorCategory::Wallet, UiErrorContext::Connect),
            FailureKind::ContractRead => (UiErrorCategory::Contract, UiErrorContext::Balance),
            FailureKind::TransferSubmission => {
                (UiErrorCategory::Transaction, UiErrorContext::Transfer)
            }
            FailureKind::InvalidInput => (UiErrorCategory::Validation, UiErrorContext::Transfer),
            FailureKind::Storage => (UiErrorCategory::Storage, UiErrorContext::General),
        };
        Self {
            category,
            context,
            message: failure.to_string(),
            retry: failure.retry_action(),
        }
    }

    /// Errors raised outside the session, e.g. while the worker starts.
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let category = if lower.contains("sqlite") || lower.contains("database") {
            UiErrorCategory::Storage
        } else if lower.contains("invalid") || lower.contains("malformed") {
            UiErrorCategory::Configuration
        } else if lower.contains("timed out")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("unreachable")
        {
            UiErrorCategory::Network
        } else {
            UiErrorCategory::Unknown
        };
        Self {
            category,
            context,
            message,
            retry: RetryAction::None,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn retry(&self) -> RetryAction {
        self.retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kinds_map_to_distinct_categories() {
        let fetch = UiError::from_failure(&SessionFailure::new(
            FailureKind::ConfigFetch,
            "connection refused",
        ));
        assert_eq!(fetch.category(), UiErrorCategory::Network);
        assert_eq!(fetch.context(), UiErrorContext::Connect);
        assert_eq!(fetch.retry(), RetryAction::Connect);
        assert_eq!(
            fetch.message(),
            "network config unavailable: connection refused"
        );

        let read = UiError::from_failure(&SessionFailure::new(FailureKind::ContractRead, "revert"));
        assert_eq!(read.category(), UiErrorCategory::Contract);
        assert_eq!(read.retry(), RetryAction::LoadBalance);

        let input = UiError::from_failure(&SessionFailure::new(FailureKind::InvalidInput, "amount"));
        assert_eq!(input.category(), UiErrorCategory::Validation);
        assert_eq!(input.retry(), RetryAction::None);
    }

    #[test]
    fn startup_messages_are_classified() {
        let storage = UiError::from_message(
            UiErrorContext::BackendStartup,
            "failed to open sqlite database 'sqlite://x.db'",
        );
        assert_eq!(storage.category(), UiErrorCategory::Storage);
        assert_eq!(storage.retry(), RetryAction::None);

        let url = UiError::from_message(UiErrorContext::BackendStartup, "invalid config url 'x'");
        assert_eq!(url.category(), UiErrorCategory::Configuration);
    }
}
