//! JSON-RPC backed implementations of the wallet transport seams.
//!
//! The node behind the endpoint is expected to manage the signing accounts
//! (`eth_accounts` / `eth_sendTransaction`), as a wallet-connected provider
//! does.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bigdecimal::num_bigint::BigInt;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{
    domain::{AccountAddress, NetworkRole, TxHash},
    network::BridgeContracts,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;
use wallet_transport::{
    BridgeClient, BridgeConnector, BridgeOptions, ReceiptStatus, TokenTransfer,
    TransactionReceipt, TransactionRequest, TransportConnector, TransportEvent, TransportOptions,
    WalletTransport,
};

pub mod abi;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc request {method} failed: {source}")]
    Http {
        method: String,
        source: reqwest::Error,
    },
    #[error("rpc error {code} from {method}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },
    #[error("unexpected result for {method}: {reason}")]
    Decode { method: String, reason: String },
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    block_number: Option<String>,
    status: Option<String>,
}

pub struct JsonRpcTransport {
    http: Client,
    endpoint: Url,
    role: NetworkRole,
    next_id: AtomicU64,
    connected: AtomicBool,
    events: broadcast::Sender<TransportEvent>,
}

impl JsonRpcTransport {
    pub fn new(http: Client, options: TransportOptions) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            http,
            endpoint: options.host,
            role: options.role,
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(false),
            events,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request_value(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(role = %self.role, method, id, "rpc request");
        let response: RpcResponse = self
            .http
            .post(self.endpoint.clone())
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|source| RpcError::Http {
                method: method.to_string(),
                source,
            })?
            .json()
            .await
            .map_err(|source| RpcError::Http {
                method: method.to_string(),
                source,
            })?;

        if let Some(error) = response.error {
            return Err(RpcError::Remote {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let value = self.request_value(method, params).await?;
        serde_json::from_value(value).map_err(|err| RpcError::Decode {
            method: method.to_string(),
            reason: err.to_string(),
        })
    }

    async fn eth_call(&self, to: &AccountAddress, data: String) -> Result<BigInt> {
        let raw: String = self
            .request("eth_call", json!([{ "to": to.as_str(), "data": data }, "latest"]))
            .await?;
        abi::decode_uint(&raw).with_context(|| format!("eth_call to {to} returned '{raw}'"))
    }
}

#[async_trait]
impl WalletTransport for JsonRpcTransport {
    fn role(&self) -> NetworkRole {
        self.role
    }

    async fn accounts(&self) -> Result<Vec<AccountAddress>> {
        let raw: Vec<String> = self.request("eth_accounts", json!([])).await?;
        let accounts = raw
            .iter()
            .map(|account| AccountAddress::parse(account))
            .collect::<Result<Vec<_>, _>>()
            .context("eth_accounts returned a malformed address")?;

        if !accounts.is_empty() && !self.connected.swap(true, Ordering::SeqCst) {
            info!(role = %self.role, endpoint = %self.endpoint, "wallet transport connected");
            let _ = self.events.send(TransportEvent::Connected(self.role));
        }
        Ok(accounts)
    }

    async fn token_balance_of(
        &self,
        token: &AccountAddress,
        owner: &AccountAddress,
    ) -> Result<BigInt> {
        self.eth_call(token, abi::balance_of_call(owner)).await
    }

    async fn token_decimals(&self, token: &AccountAddress) -> Result<u8> {
        let value = self.eth_call(token, abi::decimals_call()).await?;
        u8::try_from(&value).map_err(|_| anyhow!("token {token} reports invalid decimals {value}"))
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash> {
        let raw: String = self
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": request.from.as_str(),
                    "to": request.to.as_str(),
                    "data": request.data,
                }]),
            )
            .await?;
        TxHash::parse(&raw).context("eth_sendTransaction returned a malformed hash")
    }

    async fn transaction_receipt(&self, tx_hash: &TxHash) -> Result<Option<TransactionReceipt>> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([tx_hash.as_str()]))
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let block_number = raw
            .block_number
            .as_deref()
            .map(abi::parse_quantity)
            .transpose()?;
        // Pre-byzantium receipts carry no status; treat a mined receipt as success.
        let status = match raw.status.as_deref().map(abi::parse_quantity).transpose()? {
            Some(0) => ReceiptStatus::Reverted,
            _ => ReceiptStatus::Succeeded,
        };
        Ok(Some(TransactionReceipt {
            tx_hash: tx_hash.clone(),
            block_number,
            status,
        }))
    }

    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(role = %self.role, "wallet transport disconnected");
            let _ = self.events.send(TransportEvent::Disconnected(self.role));
        }
        Ok(())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

/// Builds [`JsonRpcTransport`]s sharing one HTTP client.
#[derive(Clone)]
pub struct JsonRpcConnector {
    http: Client,
}

impl JsonRpcConnector {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build rpc http client")?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TransportConnector for JsonRpcConnector {
    async fn connect(&self, options: TransportOptions) -> Result<Arc<dyn WalletTransport>> {
        match options.host.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("unsupported rpc scheme '{other}' for {}", options.role)),
        }
        Ok(Arc::new(JsonRpcTransport::new(self.http.clone(), options)))
    }
}

/// Bridge client that submits plain ERC-20 transfers on the sidechain.
pub struct TokenBridge {
    sidechain: Arc<dyn WalletTransport>,
    contracts: BridgeContracts,
    syncer_url: Option<Url>,
    watcher_url: Option<Url>,
}

impl TokenBridge {
    pub fn new(options: BridgeOptions) -> Self {
        Self {
            sidechain: options.sidechain,
            contracts: options.contracts,
            syncer_url: options.syncer_url,
            watcher_url: options.watcher_url,
        }
    }

    pub fn contracts(&self) -> &BridgeContracts {
        &self.contracts
    }

    pub fn syncer_url(&self) -> Option<&Url> {
        self.syncer_url.as_ref()
    }

    pub fn watcher_url(&self) -> Option<&Url> {
        self.watcher_url.as_ref()
    }
}

#[async_trait]
impl BridgeClient for TokenBridge {
    async fn transfer_tokens(&self, transfer: TokenTransfer) -> Result<TxHash> {
        let data = abi::transfer_call(&transfer.recipient, &transfer.amount)?;
        let tx_hash = self
            .sidechain
            .send_transaction(TransactionRequest {
                from: transfer.from,
                to: transfer.token,
                data,
            })
            .await?;
        info!(tx_hash = %tx_hash, recipient = %transfer.recipient, "token transfer submitted");
        Ok(tx_hash)
    }
}

pub struct TokenBridgeConnector;

#[async_trait]
impl BridgeConnector for TokenBridgeConnector {
    async fn build(&self, options: BridgeOptions) -> Result<Arc<dyn BridgeClient>> {
        if options.sidechain.role() != NetworkRole::Sidechain
            || options.rootchain.role() != NetworkRole::Rootchain
        {
            return Err(anyhow!("bridge transports are wired to the wrong networks"));
        }
        let bridge = TokenBridge::new(options);
        info!(
            root_chain = %bridge.contracts().root_chain,
            deposit_manager = %bridge.contracts().deposit_manager,
            withdraw_manager = %bridge.contracts().withdraw_manager,
            syncer = ?bridge.syncer_url().map(Url::as_str),
            watcher = ?bridge.watcher_url().map(Url::as_str),
            "bridge client ready"
        );
        Ok(Arc::new(bridge))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
