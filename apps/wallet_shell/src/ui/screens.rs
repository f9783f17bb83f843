use std::fmt::Write as _;

use client_core::{faucet_link, SessionEvent, SessionPhase, SessionSnapshot, TransferForm};
use crossbeam_channel::Receiver;
use shared::error::RetryAction;
use url::Url;

use crate::controller::events::{UiError, UiEvent};

pub const HELP: &str = "\
commands:
  connect            connect the wallet
  disconnect         end the session and forget it
  balance            reload the test-token balance
  to <address>       set the transfer recipient
  amount <value>     set the transfer amount (token units)
  set <field> <val>  set a form field by name (toAddress, toAmount)
  transfer           submit the transfer
  form               show the transfer form
  retry              re-run the last failed operation
  status             show the current session
  help               show this list
  quit               leave (the session is restored next time)";

/// Prints backend events until the backend worker hangs up.
pub fn render_loop(ui_rx: Receiver<UiEvent>, faucet_base: Url) {
    for event in ui_rx.iter() {
        if let Some(text) = render_event(&event, &faucet_base) {
            println!("{text}");
        }
    }
}

pub fn render_event(event: &UiEvent, faucet_base: &Url) -> Option<String> {
    match event {
        UiEvent::Info(message) => Some(format!("* {message}")),
        UiEvent::Snapshot(snapshot) => Some(render_snapshot(snapshot, faucet_base)),
        UiEvent::Error(error) => Some(render_error(error)),
        UiEvent::Session(event) => match event {
            SessionEvent::PhaseChanged(SessionPhase::Connecting) => {
                Some("* Connecting to wallet...".to_string())
            }
            SessionEvent::TransactionSubmitted { tx_hash } => {
                Some(format!("* Transfer submitted: {tx_hash}"))
            }
            SessionEvent::TransferSettled { tx_hash, success } => Some(if *success {
                format!("* Transfer {tx_hash} confirmed")
            } else {
                format!("* Transfer {tx_hash} reverted")
            }),
            _ => None,
        },
    }
}

pub fn render_snapshot(snapshot: &SessionSnapshot, faucet_base: &Url) -> String {
    let mut out = String::new();
    match (snapshot.phase, &snapshot.account) {
        (SessionPhase::Connected, Some(account)) => {
            let _ = writeln!(out, "== {account} ==  [disconnect]");
            let balance = snapshot
                .balance
                .as_ref()
                .map_or_else(|| "loading...".to_string(), ToString::to_string);
            let _ = writeln!(out, "Balance: {balance} TST");
            if let Some(token) = snapshot.token_address() {
                let _ = writeln!(out, "Token:   {token}");
            }
            let _ = writeln!(out, "Faucet:  {}", faucet_link(faucet_base, account));
        }
        (SessionPhase::Connecting, _) => {
            let _ = writeln!(out, "Connecting to wallet...");
        }
        _ => {
            let _ = writeln!(out, "Not connected. Type `connect` to connect your wallet.");
        }
    }
    if let Some(failure) = &snapshot.last_error {
        let _ = writeln!(out, "! {failure}{}", retry_hint(failure.retry_action()));
    }
    out.trim_end().to_string()
}

pub fn render_form(form: &TransferForm) -> String {
    let to = if form.to_address.is_empty() {
        "<unset>"
    } else {
        form.to_address.as_str()
    };
    let submit = if form.can_submit() {
        "ready: type `transfer`"
    } else {
        "disabled"
    };
    format!("Transfer to {to}, amount {} ({submit})", form.to_amount)
}

fn render_error(error: &UiError) -> String {
    format!("! {}{}", error.message(), retry_hint(error.retry()))
}

fn retry_hint(action: RetryAction) -> &'static str {
    match action {
        RetryAction::Connect => " (type `retry` to reconnect)",
        RetryAction::LoadBalance => " (type `retry` to reload the balance)",
        RetryAction::SubmitTransfer => " (type `retry` to resubmit)",
        RetryAction::None => "",
    }
}

#[cfg(test)]
#[path = "tests/screens_tests.rs"]
mod tests;
