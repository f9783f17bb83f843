//! Typed view of the published network document.
//!
//! The document maps an environment name (`"TestnetV2"`, ...) to a record with
//! one entry per network (`"Matic"` for the sidechain, `"Main"` for the
//! rootchain). It is validated as soon as it is fetched so that client
//! construction never sees a half-formed config.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::domain::{AccountAddress, HexIdError, NetworkRole};

pub const DEFAULT_NETWORK_ENV: &str = "TestnetV2";

pub mod contracts {
    pub const ROOT_CHAIN: &str = "RootChain";
    pub const WITHDRAW_MANAGER: &str = "WithdrawManager";
    pub const DEPOSIT_MANAGER: &str = "DepositManager";
    pub const CHILD_WETH: &str = "ChildWETH";
    pub const CHILD_TEST_TOKEN: &str = "ChildTestToken";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("network document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("network environment '{0}' not found in document")]
    MissingEnvironment(String),
    #[error("network environment '{environment}' is malformed: {reason}")]
    MalformedEnvironment { environment: String, reason: String },
    #[error("{role} network: missing field '{field}'")]
    MissingField { role: NetworkRole, field: String },
    #[error("{role} network: invalid url in '{field}': {source}")]
    InvalidUrl {
        role: NetworkRole,
        field: &'static str,
        source: url::ParseError,
    },
    #[error("{role} network: contract '{name}' is not an address: {source}")]
    InvalidContract {
        role: NetworkRole,
        name: String,
        source: HexIdError,
    },
}

#[derive(Debug, Deserialize)]
struct RawEnvironment {
    #[serde(rename = "Matic")]
    matic: Option<RawNetwork>,
    #[serde(rename = "Main")]
    main: Option<RawNetwork>,
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
    #[serde(rename = "RPC")]
    rpc: Option<String>,
    #[serde(rename = "Contracts", default)]
    contracts: serde_json::Map<String, Value>,
    #[serde(rename = "SyncerAPI")]
    syncer_api: Option<String>,
    #[serde(rename = "WatcherAPI")]
    watcher_api: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainEndpoint {
    pub role: NetworkRole,
    pub rpc: Url,
    /// Every string-valued entry of `Contracts`, unvalidated.
    pub contracts: BTreeMap<String, String>,
    pub syncer_api: Option<Url>,
    pub watcher_api: Option<Url>,
}

impl ChainEndpoint {
    fn from_raw(role: NetworkRole, raw: RawNetwork) -> Result<Self, ConfigError> {
        let rpc = raw.rpc.ok_or_else(|| ConfigError::MissingField {
            role,
            field: "RPC".to_string(),
        })?;
        let rpc = Url::parse(rpc.trim()).map_err(|source| ConfigError::InvalidUrl {
            role,
            field: "RPC",
            source,
        })?;
        let syncer_api = optional_url(role, "SyncerAPI", raw.syncer_api)?;
        let watcher_api = optional_url(role, "WatcherAPI", raw.watcher_api)?;
        let contracts = raw
            .contracts
            .into_iter()
            .filter_map(|(name, value)| match value {
                Value::String(address) => Some((name, address)),
                _ => None,
            })
            .collect();

        Ok(Self {
            role,
            rpc,
            contracts,
            syncer_api,
            watcher_api,
        })
    }

    pub fn contract(&self, name: &str) -> Result<AccountAddress, ConfigError> {
        let raw = self
            .contracts
            .get(name)
            .ok_or_else(|| ConfigError::MissingField {
                role: self.role,
                field: format!("Contracts.{name}"),
            })?;
        AccountAddress::parse(raw).map_err(|source| ConfigError::InvalidContract {
            role: self.role,
            name: name.to_string(),
            source,
        })
    }
}

fn optional_url(
    role: NetworkRole,
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<Url>, ConfigError> {
    match raw {
        Some(value) if !value.trim().is_empty() => Url::parse(value.trim())
            .map(Some)
            .map_err(|source| ConfigError::InvalidUrl {
                role,
                field,
                source,
            }),
        _ => Ok(None),
    }
}

/// Rootchain contracts plus sidechain wrapped-native token used by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeContracts {
    pub root_chain: AccountAddress,
    pub withdraw_manager: AccountAddress,
    pub deposit_manager: AccountAddress,
    pub child_weth: AccountAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    pub environment: String,
    pub sidechain: ChainEndpoint,
    pub rootchain: ChainEndpoint,
    pub bridge: BridgeContracts,
    pub test_token: AccountAddress,
}

impl NetworkConfig {
    pub fn parse_document(raw: &str, environment: &str) -> Result<Self, ConfigError> {
        let document: Value = serde_json::from_str(raw)?;
        Self::from_document(&document, environment)
    }

    pub fn from_document(document: &Value, environment: &str) -> Result<Self, ConfigError> {
        let env_value = document
            .get(environment)
            .ok_or_else(|| ConfigError::MissingEnvironment(environment.to_string()))?;
        let raw: RawEnvironment = serde_json::from_value(env_value.clone()).map_err(|err| {
            ConfigError::MalformedEnvironment {
                environment: environment.to_string(),
                reason: err.to_string(),
            }
        })?;

        let sidechain = raw.matic.ok_or_else(|| ConfigError::MissingField {
            role: NetworkRole::Sidechain,
            field: NetworkRole::Sidechain.document_key().to_string(),
        })?;
        let rootchain = raw.main.ok_or_else(|| ConfigError::MissingField {
            role: NetworkRole::Rootchain,
            field: NetworkRole::Rootchain.document_key().to_string(),
        })?;
        let sidechain = ChainEndpoint::from_raw(NetworkRole::Sidechain, sidechain)?;
        let rootchain = ChainEndpoint::from_raw(NetworkRole::Rootchain, rootchain)?;

        let bridge = BridgeContracts {
            root_chain: rootchain.contract(contracts::ROOT_CHAIN)?,
            withdraw_manager: rootchain.contract(contracts::WITHDRAW_MANAGER)?,
            deposit_manager: rootchain.contract(contracts::DEPOSIT_MANAGER)?,
            child_weth: sidechain.contract(contracts::CHILD_WETH)?,
        };
        let test_token = sidechain.contract(contracts::CHILD_TEST_TOKEN)?;

        Ok(Self {
            environment: environment.to_string(),
            sidechain,
            rootchain,
            bridge,
            test_token,
        })
    }

    pub fn endpoint(&self, role: NetworkRole) -> &ChainEndpoint {
        match role {
            NetworkRole::Sidechain => &self.sidechain,
            NetworkRole::Rootchain => &self.rootchain,
        }
    }

    /// Environments present in a raw document, for diagnostics.
    pub fn environments(document: &Value) -> Vec<String> {
        document
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "tests/network_tests.rs"]
mod tests;
