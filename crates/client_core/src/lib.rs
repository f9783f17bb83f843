//! Wallet session orchestration.
//!
//! [`SessionOrchestrator`] owns the lifecycle of one wallet session: it
//! fetches the network document, builds the sidechain/rootchain transports
//! and the bridge client, discovers the signing account, keeps the
//! test-token balance fresh and submits transfers. Presentation layers read
//! [`SessionSnapshot`]s and listen to [`SessionEvent`]s.

use std::{mem, sync::Arc};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use shared::{
    amount::TokenAmount,
    domain::{AccountAddress, NetworkRole, TxHash},
    error::{RetryAction, SessionFailure},
    network::{NetworkConfig, DEFAULT_NETWORK_ENV},
};
use storage::{KeyValueStore, LOGGED_IN_KEY};
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        Mutex,
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use wallet_transport::{
    BridgeClient, BridgeConnector, BridgeOptions, ReceiptStatus, TokenTransfer,
    TransportConnector, TransportEvent, TransportOptions, WalletTransport,
};

pub mod config_source;
pub mod error;
pub mod form;
pub mod refresh;

pub use config_source::{ConfigSource, FileConfigSource, HttpConfigSource, StaticConfigSource};
pub use error::SessionError;
pub use form::{faucet_link, FormField, TransferForm};
pub use refresh::BalanceRefreshPolicy;

const LOGGED_IN_VALUE: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub account: Option<AccountAddress>,
    pub network: Option<Arc<NetworkConfig>>,
    pub balance: Option<TokenAmount>,
    pub decimals: Option<u8>,
    pub last_error: Option<SessionFailure>,
    pub connected_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.phase == SessionPhase::Connected
    }

    pub fn token_address(&self) -> Option<&AccountAddress> {
        self.network.as_ref().map(|network| &network.test_token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    AccountChanged(Option<AccountAddress>),
    BalanceUpdated(TokenAmount),
    TransactionSubmitted { tx_hash: TxHash },
    TransferSettled { tx_hash: TxHash, success: bool },
    Failed(SessionFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub tx_hash: TxHash,
    pub amount: TokenAmount,
    pub recipient: AccountAddress,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub network_env: String,
    pub refresh_policy: BalanceRefreshPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            network_env: DEFAULT_NETWORK_ENV.to_string(),
            refresh_policy: BalanceRefreshPolicy::default(),
        }
    }
}

pub struct SessionDependencies {
    pub config_source: Arc<dyn ConfigSource>,
    pub transports: Arc<dyn TransportConnector>,
    pub bridges: Arc<dyn BridgeConnector>,
    pub store: Arc<dyn KeyValueStore>,
}

#[derive(Clone)]
struct ActiveClients {
    sidechain: Arc<dyn WalletTransport>,
    rootchain: Arc<dyn WalletTransport>,
    bridge: Arc<dyn BridgeClient>,
}

impl ActiveClients {
    async fn disconnect(&self) {
        for transport in [&self.sidechain, &self.rootchain] {
            if let Err(err) = transport.disconnect().await {
                warn!(role = %transport.role(), "transport disconnect failed: {err:#}");
            }
        }
    }
}

struct SessionState {
    phase: SessionPhase,
    /// Bumped by every connect and disconnect; async work started under an
    /// older value must not write back.
    generation: u64,
    /// Latest balance load; only its result is stored.
    balance_ticket: u64,
    account: Option<AccountAddress>,
    network: Option<Arc<NetworkConfig>>,
    clients: Option<ActiveClients>,
    balance: Option<TokenAmount>,
    decimals: Option<u8>,
    last_error: Option<SessionFailure>,
    connected_at: Option<DateTime<Utc>>,
    background: Vec<JoinHandle<()>>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            account: self.account.clone(),
            network: self.network.clone(),
            balance: self.balance.clone(),
            decimals: self.decimals,
            last_error: self.last_error.clone(),
            connected_at: self.connected_at,
        }
    }

    fn clear_session(&mut self) {
        self.phase = SessionPhase::Disconnected;
        self.account = None;
        self.network = None;
        self.balance = None;
        self.decimals = None;
        self.connected_at = None;
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.background.retain(|task| !task.is_finished());
        self.background.push(handle);
    }
}

/// Connected session context captured under the lock for one operation.
struct ActiveContext {
    generation: u64,
    account: AccountAddress,
    token: AccountAddress,
    clients: ActiveClients,
}

pub struct SessionOrchestrator {
    config_source: Arc<dyn ConfigSource>,
    transports: Arc<dyn TransportConnector>,
    bridges: Arc<dyn BridgeConnector>,
    store: Arc<dyn KeyValueStore>,
    options: SessionOptions,
    inner: Mutex<SessionState>,
    /// Held across every write of the stored marker.
    marker: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionOrchestrator {
    pub fn new_with_dependencies(
        dependencies: SessionDependencies,
        options: SessionOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            config_source: dependencies.config_source,
            transports: dependencies.transports,
            bridges: dependencies.bridges,
            store: dependencies.store,
            options,
            inner: Mutex::new(SessionState {
                phase: SessionPhase::Disconnected,
                generation: 0,
                balance_ticket: 0,
                account: None,
                network: None,
                clients: None,
                balance: None,
                decimals: None,
                last_error: None,
                connected_at: None,
                background: Vec::new(),
            }),
            marker: Mutex::new(()),
            events,
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Restores a previous session when the stored marker says so.
    ///
    /// Returns the spawned connect task, or `None` when nothing was started.
    pub async fn initialize(
        self: &Arc<Self>,
    ) -> Option<JoinHandle<Result<SessionSnapshot, SessionError>>> {
        match self.store.get(LOGGED_IN_KEY).await {
            Ok(Some(flag)) if !flag.is_empty() => {
                info!(source = %self.config_source.describe(), "restoring previous wallet session");
                let session = Arc::clone(self);
                Some(tokio::spawn(async move { session.connect().await }))
            }
            Ok(_) => {
                debug!("no previous wallet session");
                None
            }
            Err(err) => {
                let generation = self.inner.lock().await.generation;
                self.record_failure(generation, SessionError::Storage(err))
                    .await;
                None
            }
        }
    }

    pub async fn connect(self: &Arc<Self>) -> Result<SessionSnapshot, SessionError> {
        let generation = {
            let mut state = self.inner.lock().await;
            if state.phase == SessionPhase::Connected {
                return Ok(state.snapshot());
            }
            state.generation += 1;
            state.phase = SessionPhase::Connecting;
            state.last_error = None;
            state.generation
        };
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Connecting));
        info!(generation, env = %self.options.network_env, "connecting wallet session");

        match self.establish(generation).await {
            Ok(snapshot) => Ok(snapshot),
            Err(SessionError::Superseded) => {
                debug!(generation, "connect superseded");
                Err(SessionError::Superseded)
            }
            Err(err) => {
                let reset = {
                    let mut state = self.inner.lock().await;
                    let current = state.generation == generation;
                    if current {
                        state.clear_session();
                    }
                    current
                };
                if reset {
                    self.emit(SessionEvent::PhaseChanged(SessionPhase::Disconnected));
                }
                Err(self.record_failure(generation, err).await)
            }
        }
    }

    async fn establish(self: &Arc<Self>, generation: u64) -> Result<SessionSnapshot, SessionError> {
        let document = self
            .config_source
            .fetch_document()
            .await
            .map_err(SessionError::ConfigFetch)?;
        self.ensure_current(generation).await?;

        let network = NetworkConfig::from_document(&document, &self.options.network_env)
            .map_err(|err| SessionError::SdkConstruction(err.into()))?;
        let network = Arc::new(network);
        let clients = self.build_clients(&network).await?;

        let account = match discover_account(&clients).await {
            Ok(account) => account,
            Err(err) => {
                clients.disconnect().await;
                return Err(err);
            }
        };

        let snapshot = {
            let mut state = self.inner.lock().await;
            if state.generation != generation {
                drop(state);
                clients.disconnect().await;
                return Err(SessionError::Superseded);
            }
            state.phase = SessionPhase::Connected;
            state.account = Some(account.clone());
            state.network = Some(Arc::clone(&network));
            state.balance = None;
            state.decimals = None;
            state.connected_at = Some(Utc::now());
            let watchers = [
                self.spawn_transport_watcher(generation, &clients.sidechain),
                self.spawn_transport_watcher(generation, &clients.rootchain),
            ];
            for watcher in watchers {
                state.track(watcher);
            }
            state.clients = Some(clients);
            state.snapshot()
        };
        info!(account = %account, token = %network.test_token, "wallet session connected");
        self.emit(SessionEvent::AccountChanged(Some(account)));
        self.emit(SessionEvent::PhaseChanged(SessionPhase::Connected));

        self.mark_logged_in(generation).await;

        let session = Arc::clone(self);
        let initial_load = tokio::spawn(async move {
            if let Err(err) = session.load_token_balance().await {
                debug!("initial balance load did not complete: {err}");
            }
        });
        self.track_for(generation, initial_load).await;

        Ok(snapshot)
    }

    async fn build_clients(&self, network: &NetworkConfig) -> Result<ActiveClients, SessionError> {
        let sidechain = self
            .transports
            .connect(TransportOptions {
                host: network.sidechain.rpc.clone(),
                role: NetworkRole::Sidechain,
            })
            .await
            .map_err(SessionError::SdkConstruction)?;
        let rootchain = match self
            .transports
            .connect(TransportOptions {
                host: network.rootchain.rpc.clone(),
                role: NetworkRole::Rootchain,
            })
            .await
        {
            Ok(transport) => transport,
            Err(err) => {
                if let Err(err) = sidechain.disconnect().await {
                    warn!("sidechain disconnect failed: {err:#}");
                }
                return Err(SessionError::SdkConstruction(err));
            }
        };

        let bridge = self
            .bridges
            .build(BridgeOptions {
                sidechain: Arc::clone(&sidechain),
                rootchain: Arc::clone(&rootchain),
                contracts: network.bridge.clone(),
                syncer_url: network.sidechain.syncer_api.clone(),
                watcher_url: network.rootchain.watcher_api.clone(),
            })
            .await;
        match bridge {
            Ok(bridge) => Ok(ActiveClients {
                sidechain,
                rootchain,
                bridge,
            }),
            Err(err) => {
                for transport in [&sidechain, &rootchain] {
                    if let Err(err) = transport.disconnect().await {
                        warn!(role = %transport.role(), "transport disconnect failed: {err:#}");
                    }
                }
                Err(SessionError::SdkConstruction(err))
            }
        }
    }

    /// Ends the session locally even when the transports fail to disconnect.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let (previous, clients, background, generation) = {
            let mut state = self.inner.lock().await;
            state.generation += 1;
            let previous = state.phase;
            let clients = state.clients.take();
            let background = mem::take(&mut state.background);
            state.clear_session();
            (previous, clients, background, state.generation)
        };

        if let Some(clients) = clients {
            clients.disconnect().await;
        }
        if previous != SessionPhase::Disconnected {
            info!("wallet session disconnected");
            self.emit(SessionEvent::AccountChanged(None));
            self.emit(SessionEvent::PhaseChanged(SessionPhase::Disconnected));
        }

        let removed = {
            let _marker = self.marker.lock().await;
            self.store.remove(LOGGED_IN_KEY).await
        };
        let result = match removed {
            Ok(()) => Ok(()),
            Err(err) => Err(self
                .record_failure(generation, SessionError::Storage(err))
                .await),
        };
        // Last: the caller may be one of these tasks.
        for task in background {
            task.abort();
        }
        result
    }

    pub async fn load_token_balance(&self) -> Result<TokenAmount, SessionError> {
        let (context, ticket) = {
            let mut state = self.inner.lock().await;
            let context = active_context(&state)?;
            state.balance_ticket += 1;
            (context, state.balance_ticket)
        };

        let transport = &context.clients.sidechain;
        let read = futures::try_join!(
            transport.token_balance_of(&context.token, &context.account),
            transport.token_decimals(&context.token),
        );
        let balance = match read.and_then(|(raw, decimals)| {
            TokenAmount::from_base_units(raw, decimals).map_err(anyhow::Error::from)
        }) {
            Ok(balance) => balance,
            Err(err) => {
                return Err(self
                    .record_failure(context.generation, SessionError::ContractRead(err))
                    .await)
            }
        };

        {
            let mut state = self.inner.lock().await;
            if state.generation != context.generation || state.balance_ticket != ticket {
                return Err(SessionError::Superseded);
            }
            state.balance = Some(balance.clone());
            state.decimals = Some(balance.decimals());
            if state
                .last_error
                .as_ref()
                .is_some_and(|failure| failure.retry_action() == RetryAction::LoadBalance)
            {
                state.last_error = None;
            }
        }
        info!(account = %context.account, balance = %balance, "token balance loaded");
        self.emit(SessionEvent::BalanceUpdated(balance.clone()));
        Ok(balance)
    }

    /// Submits a transfer of `amount` (display units) to `recipient`, then
    /// schedules one balance reload according to the refresh policy.
    pub async fn transfer_tokens(
        self: &Arc<Self>,
        recipient: &str,
        amount: &str,
    ) -> Result<TransferOutcome, SessionError> {
        let (context, decimals) = {
            let state = self.inner.lock().await;
            let context = active_context(&state)?;
            (context, state.decimals)
        };
        let generation = context.generation;

        let prepared = decimals.ok_or(SessionError::DecimalsUnknown).and_then(|decimals| {
            let recipient =
                AccountAddress::parse(recipient).map_err(|err| SessionError::InvalidInput {
                    field: "recipient",
                    reason: err.to_string(),
                })?;
            let amount = TokenAmount::parse_display(amount, decimals).map_err(|err| {
                SessionError::InvalidInput {
                    field: "amount",
                    reason: err.to_string(),
                }
            })?;
            if amount.is_zero() {
                return Err(SessionError::InvalidInput {
                    field: "amount",
                    reason: "amount must be greater than zero".to_string(),
                });
            }
            Ok((recipient, amount))
        });
        let (recipient, amount) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return Err(self.record_failure(generation, err).await),
        };

        let submitted = context
            .clients
            .bridge
            .transfer_tokens(TokenTransfer {
                token: context.token.clone(),
                recipient: recipient.clone(),
                amount: amount.base_units().clone(),
                from: context.account.clone(),
            })
            .await;
        let tx_hash = match submitted {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                return Err(self
                    .record_failure(generation, SessionError::TransferSubmission(err))
                    .await)
            }
        };

        info!(tx_hash = %tx_hash, recipient = %recipient, amount = %amount, "transfer submitted");
        {
            let mut state = self.inner.lock().await;
            if state.generation == generation
                && state
                    .last_error
                    .as_ref()
                    .is_some_and(|failure| failure.retry_action() == RetryAction::SubmitTransfer)
            {
                state.last_error = None;
            }
        }
        self.emit(SessionEvent::TransactionSubmitted {
            tx_hash: tx_hash.clone(),
        });
        self.schedule_balance_refresh(
            generation,
            Arc::clone(&context.clients.sidechain),
            tx_hash.clone(),
        )
        .await;

        Ok(TransferOutcome {
            tx_hash,
            amount,
            recipient,
        })
    }

    /// Re-runs the operation named by the last failure's retry action.
    ///
    /// Transfers are not resubmitted here: the caller owns the form values.
    pub async fn retry_last_failure(self: &Arc<Self>) -> Result<RetryAction, SessionError> {
        let action = self
            .inner
            .lock()
            .await
            .last_error
            .as_ref()
            .map_or(RetryAction::None, SessionFailure::retry_action);
        match action {
            RetryAction::Connect => {
                self.connect().await?;
            }
            RetryAction::LoadBalance => {
                self.load_token_balance().await?;
            }
            RetryAction::SubmitTransfer | RetryAction::None => {}
        }
        Ok(action)
    }

    async fn schedule_balance_refresh(
        self: &Arc<Self>,
        generation: u64,
        sidechain: Arc<dyn WalletTransport>,
        tx_hash: TxHash,
    ) {
        let session = Arc::clone(self);
        let policy = self.options.refresh_policy.clone();
        let task = tokio::spawn(async move {
            let settled = policy.wait_for_settlement(sidechain.as_ref(), &tx_hash).await;
            if let Some(status) = settled {
                let success = status == ReceiptStatus::Succeeded;
                session.emit(SessionEvent::TransferSettled {
                    tx_hash: tx_hash.clone(),
                    success,
                });
                if !success {
                    session
                        .record_failure(
                            generation,
                            SessionError::TransferSubmission(anyhow!(
                                "transaction {tx_hash} reverted"
                            )),
                        )
                        .await;
                }
            }
            if session.ensure_current(generation).await.is_err() {
                return;
            }
            if let Err(err) = session.load_token_balance().await {
                debug!(tx_hash = %tx_hash, "post-transfer balance reload failed: {err}");
            }
        });
        self.track_for(generation, task).await;
    }

    fn spawn_transport_watcher(
        self: &Arc<Self>,
        generation: u64,
        transport: &Arc<dyn WalletTransport>,
    ) -> JoinHandle<()> {
        let mut events = transport.subscribe_events();
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "transport events lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(session) = session.upgrade() else {
                    break;
                };
                match event {
                    TransportEvent::Connected(role) => {
                        debug!(role = %role, "transport reported connect");
                        if session.ensure_current(generation).await.is_ok() {
                            session.mark_logged_in(generation).await;
                        }
                    }
                    TransportEvent::Disconnected(role) => {
                        if session.ensure_current(generation).await.is_ok() {
                            info!(role = %role, "transport reported disconnect; ending session");
                            if let Err(err) = session.disconnect().await {
                                warn!("failed to end session after transport disconnect: {err}");
                            }
                        }
                        break;
                    }
                }
            }
        })
    }

    /// Writes the marker unless a disconnect already moved past `generation`.
    async fn mark_logged_in(&self, generation: u64) {
        let _marker = self.marker.lock().await;
        if self.ensure_current(generation).await.is_err() {
            debug!(generation, "session ended before the marker was written");
            return;
        }
        if let Err(err) = self.store.set(LOGGED_IN_KEY, LOGGED_IN_VALUE).await {
            self.record_failure(generation, SessionError::Storage(err))
                .await;
        }
    }

    async fn ensure_current(&self, generation: u64) -> Result<(), SessionError> {
        if self.inner.lock().await.generation == generation {
            Ok(())
        } else {
            Err(SessionError::Superseded)
        }
    }

    async fn track_for(&self, generation: u64, task: JoinHandle<()>) {
        let mut state = self.inner.lock().await;
        if state.generation == generation {
            state.track(task);
        } else {
            task.abort();
        }
    }

    /// Stores and publishes a user-facing failure unless the session moved on.
    async fn record_failure(&self, generation: u64, err: SessionError) -> SessionError {
        let Some(failure) = err.to_failure() else {
            return err;
        };
        let current = {
            let mut state = self.inner.lock().await;
            let current = state.generation == generation;
            if current {
                state.last_error = Some(failure.clone());
            }
            current
        };
        if current {
            warn!(kind = ?failure.kind, "{failure}");
            self.emit(SessionEvent::Failed(failure));
        } else {
            debug!(kind = ?failure.kind, "dropping failure from a stale session: {failure}");
        }
        err
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

fn active_context(state: &SessionState) -> Result<ActiveContext, SessionError> {
    match (&state.phase, &state.account, &state.network, &state.clients) {
        (SessionPhase::Connected, Some(account), Some(network), Some(clients)) => {
            Ok(ActiveContext {
                generation: state.generation,
                account: account.clone(),
                token: network.test_token.clone(),
                clients: clients.clone(),
            })
        }
        _ => Err(SessionError::NotConnected),
    }
}

async fn discover_account(clients: &ActiveClients) -> Result<AccountAddress, SessionError> {
    let accounts = clients
        .sidechain
        .accounts()
        .await
        .map_err(SessionError::AccountDiscovery)?;
    accounts
        .into_iter()
        .next()
        .ok_or_else(|| SessionError::AccountDiscovery(anyhow!("wallet exposed no accounts")))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
