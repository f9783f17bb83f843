//! Backend worker thread: owns the tokio runtime and the session orchestrator.

use std::{sync::Arc, thread};

use anyhow::{Context, Result};
use chain_rpc::{JsonRpcConnector, TokenBridgeConnector};
use client_core::{
    ConfigSource, FileConfigSource, HttpConfigSource, SessionDependencies, SessionError,
    SessionEvent, SessionOptions, SessionOrchestrator, SessionPhase,
};
use crossbeam_channel::{Receiver, Sender};
use shared::error::RetryAction;
use storage::{KeyValueStore, MemoryStore, Storage};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use url::Url;

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::events::{UiError, UiErrorContext, UiEvent},
    settings::Settings,
};

pub struct BackendConfig {
    pub settings: Settings,
    /// Keep the session marker in memory instead of SQLite.
    pub ephemeral: bool,
}

pub fn spawn_backend_thread(
    config: BackendConfig,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };
        runtime.block_on(run_backend(config, cmd_rx, ui_tx));
    })
}

async fn build_session(config: &BackendConfig) -> Result<Arc<SessionOrchestrator>> {
    let settings = &config.settings;
    let timeout = settings.http_timeout();

    let config_source: Arc<dyn ConfigSource> = match &settings.config_file {
        Some(path) => Arc::new(FileConfigSource::new(path)),
        None => {
            let url = Url::parse(&settings.config_url)
                .with_context(|| format!("invalid config url '{}'", settings.config_url))?;
            Arc::new(HttpConfigSource::new(url, timeout)?)
        }
    };
    let store: Arc<dyn KeyValueStore> = if config.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(Storage::new(&settings.database_url).await?)
    };
    let source = config_source.describe();

    let session = SessionOrchestrator::new_with_dependencies(
        SessionDependencies {
            config_source,
            transports: Arc::new(JsonRpcConnector::new(timeout)?),
            bridges: Arc::new(TokenBridgeConnector),
            store,
        },
        SessionOptions {
            network_env: settings.network_env.clone(),
            refresh_policy: settings.refresh_policy(),
        },
    );
    let options = session.options();
    tracing::info!(
        source = %source,
        env = %options.network_env,
        refresh_after = ?options.refresh_policy.min_delay(),
        ephemeral = config.ephemeral,
        "session backend configured"
    );
    Ok(session)
}

async fn run_backend(config: BackendConfig, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    let session = match build_session(&config).await {
        Ok(session) => session,
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::BackendStartup,
                format!("backend worker startup failure: {err:#}"),
            )));
            tracing::error!("failed to start session backend: {err:#}");
            return;
        }
    };
    let forwarder = spawn_event_forwarder(&session, ui_tx.clone());

    let mut last_transfer: Option<(String, String)> = None;
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BackendCommand::Initialize => {
                if session.initialize().await.is_some() {
                    let _ = ui_tx.try_send(UiEvent::Info(
                        "Restoring previous wallet session...".to_string(),
                    ));
                } else {
                    let _ = ui_tx.try_send(UiEvent::Snapshot(session.snapshot().await));
                }
            }
            BackendCommand::Connect => {
                // Off the command loop so a later `disconnect` can supersede it.
                let session = Arc::clone(&session);
                let ui_tx = ui_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = session.connect().await {
                        report_unrecorded(&ui_tx, err);
                    }
                });
            }
            BackendCommand::Disconnect => {
                if let Err(err) = session.disconnect().await {
                    report_unrecorded(&ui_tx, err);
                }
            }
            BackendCommand::LoadBalance => {
                if let Err(err) = session.load_token_balance().await {
                    report_unrecorded(&ui_tx, err);
                }
            }
            BackendCommand::Transfer { to, amount } => {
                last_transfer = Some((to.clone(), amount.clone()));
                if let Err(err) = session.transfer_tokens(&to, &amount).await {
                    report_unrecorded(&ui_tx, err);
                }
            }
            BackendCommand::Retry => match session.retry_last_failure().await {
                Ok(RetryAction::SubmitTransfer) => match last_transfer.clone() {
                    Some((to, amount)) => {
                        if let Err(err) = session.transfer_tokens(&to, &amount).await {
                            report_unrecorded(&ui_tx, err);
                        }
                    }
                    None => {
                        let _ = ui_tx.try_send(UiEvent::Info("No transfer to resubmit".to_string()));
                    }
                },
                Ok(RetryAction::None) => {
                    let _ = ui_tx.try_send(UiEvent::Info("Nothing to retry".to_string()));
                }
                Ok(_) => {}
                Err(err) => report_unrecorded(&ui_tx, err),
            },
            BackendCommand::Status => {
                let _ = ui_tx.try_send(UiEvent::Snapshot(session.snapshot().await));
            }
        }
    }

    tracing::debug!("command queue closed; stopping backend worker");
    forwarder.abort();
}

/// Failures with a kind already reached the shell as `SessionEvent::Failed`.
fn report_unrecorded(ui_tx: &Sender<UiEvent>, err: SessionError) {
    match err {
        SessionError::NotConnected => {
            let _ = ui_tx.try_send(UiEvent::Info(
                "Wallet is not connected; type `connect` first".to_string(),
            ));
        }
        SessionError::Superseded => tracing::debug!("operation superseded"),
        other => tracing::debug!("operation failed: {other}"),
    }
}

fn spawn_event_forwarder(session: &Arc<SessionOrchestrator>, ui_tx: Sender<UiEvent>) -> JoinHandle<()> {
    let mut events = session.subscribe_events();
    let session = Arc::clone(session);
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "shell lagged behind session events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let rerender = matches!(
                event,
                SessionEvent::PhaseChanged(SessionPhase::Connected | SessionPhase::Disconnected)
                    | SessionEvent::BalanceUpdated(_)
            );
            let ui_event = match event {
                SessionEvent::Failed(failure) => UiEvent::Error(UiError::from_failure(&failure)),
                other => UiEvent::Session(other),
            };
            let _ = ui_tx.try_send(ui_event);
            if rerender {
                let _ = ui_tx.try_send(UiEvent::Snapshot(session.snapshot().await));
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
