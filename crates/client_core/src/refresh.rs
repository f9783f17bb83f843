use std::time::Duration;

use shared::domain::TxHash;
use tracing::{debug, warn};
use wallet_transport::{ReceiptStatus, WalletTransport};

pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// When to reload the balance after a transfer reported its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceRefreshPolicy {
    /// Sleep, then reload. Does not check that the transfer landed.
    FixedDelay(Duration),
    /// Sleep `initial_delay`, then poll for the receipt before reloading.
    AwaitReceipt {
        initial_delay: Duration,
        poll_interval: Duration,
        max_polls: u32,
    },
}

impl Default for BalanceRefreshPolicy {
    fn default() -> Self {
        BalanceRefreshPolicy::FixedDelay(DEFAULT_REFRESH_DELAY)
    }
}

impl BalanceRefreshPolicy {
    pub fn min_delay(&self) -> Duration {
        match self {
            BalanceRefreshPolicy::FixedDelay(delay) => *delay,
            BalanceRefreshPolicy::AwaitReceipt { initial_delay, .. } => *initial_delay,
        }
    }

    /// Waits according to the policy; returns the receipt status when one was seen.
    pub(crate) async fn wait_for_settlement(
        &self,
        transport: &dyn WalletTransport,
        tx_hash: &TxHash,
    ) -> Option<ReceiptStatus> {
        match self {
            BalanceRefreshPolicy::FixedDelay(delay) => {
                tokio::time::sleep(*delay).await;
                None
            }
            BalanceRefreshPolicy::AwaitReceipt {
                initial_delay,
                poll_interval,
                max_polls,
            } => {
                tokio::time::sleep(*initial_delay).await;
                for attempt in 1..=*max_polls {
                    match transport.transaction_receipt(tx_hash).await {
                        Ok(Some(receipt)) => {
                            debug!(tx_hash = %tx_hash, attempt, "transaction receipt found");
                            return Some(receipt.status);
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(tx_hash = %tx_hash, attempt, "receipt lookup failed: {err:#}")
                        }
                    }
                    if attempt < *max_polls {
                        tokio::time::sleep(*poll_interval).await;
                    }
                }
                warn!(tx_hash = %tx_hash, max_polls, "transaction not confirmed; reloading balance anyway");
                None
            }
        }
    }
}
