//! Seams between the session layer and the external chain clients.
//!
//! A [`WalletTransport`] is the connection to a signing wallet on one network;
//! a [`BridgeClient`] mediates token movements using the sidechain and rootchain
//! transports. Connect/disconnect notifications are published as
//! [`TransportEvent`]s instead of callbacks.

use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::num_bigint::BigInt;
use shared::{
    domain::{AccountAddress, NetworkRole, TxHash},
    network::BridgeContracts,
};
use tokio::sync::broadcast;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub host: Url,
    pub role: NetworkRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Connected(NetworkRole),
    Disconnected(NetworkRole),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: AccountAddress,
    pub to: AccountAddress,
    /// ABI-encoded call data, `0x`-prefixed.
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Succeeded,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: ReceiptStatus,
}

#[async_trait]
pub trait WalletTransport: Send + Sync {
    fn role(&self) -> NetworkRole;
    async fn accounts(&self) -> anyhow::Result<Vec<AccountAddress>>;
    async fn token_balance_of(
        &self,
        token: &AccountAddress,
        owner: &AccountAddress,
    ) -> anyhow::Result<BigInt>;
    async fn token_decimals(&self, token: &AccountAddress) -> anyhow::Result<u8>;
    async fn send_transaction(&self, request: TransactionRequest) -> anyhow::Result<TxHash>;
    async fn transaction_receipt(&self, tx_hash: &TxHash)
        -> anyhow::Result<Option<TransactionReceipt>>;
    async fn disconnect(&self) -> anyhow::Result<()>;
    fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent>;
}

#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, options: TransportOptions) -> anyhow::Result<Arc<dyn WalletTransport>>;
}

#[derive(Clone)]
pub struct BridgeOptions {
    pub sidechain: Arc<dyn WalletTransport>,
    pub rootchain: Arc<dyn WalletTransport>,
    pub contracts: BridgeContracts,
    pub syncer_url: Option<Url>,
    pub watcher_url: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    pub token: AccountAddress,
    pub recipient: AccountAddress,
    /// Integer amount in the token's base units.
    pub amount: BigInt,
    pub from: AccountAddress,
}

#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Submits a sidechain token transfer, resolving once the transport
    /// reports the transaction hash.
    async fn transfer_tokens(&self, transfer: TokenTransfer) -> anyhow::Result<TxHash>;
}

#[async_trait]
pub trait BridgeConnector: Send + Sync {
    async fn build(&self, options: BridgeOptions) -> anyhow::Result<Arc<dyn BridgeClient>>;
}
