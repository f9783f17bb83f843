use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
};

mod backend_bridge;
mod controller;
mod settings;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::TransferForm;
use crossbeam_channel::bounded;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::{
    backend_bridge::{
        commands::BackendCommand,
        runtime::{spawn_backend_thread, BackendConfig},
    },
    controller::{events::UiEvent, orchestration::dispatch_backend_command},
    settings::{load_settings, normalize_database_url, Settings, DEFAULT_SETTINGS_FILE},
    ui::{
        input::{parse_line, ShellInput},
        screens,
    },
};

#[derive(Parser, Debug)]
#[command(name = "wallet_shell", about = "Wallet session for the sidechain test token")]
struct Cli {
    /// TOML settings file; missing files fall back to defaults.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    #[arg(long)]
    config_url: Option<String>,
    /// Read the network document from a local file instead of `config_url`.
    #[arg(long)]
    config_file: Option<PathBuf>,
    #[arg(long)]
    network_env: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    faucet_url: Option<String>,
    /// Do not persist the session marker.
    #[arg(long)]
    ephemeral: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.config_url {
            settings.config_url = v.clone();
        }
        if let Some(v) = &self.config_file {
            settings.config_file = Some(v.clone());
        }
        if let Some(v) = &self.network_env {
            settings.network_env = v.clone();
        }
        if let Some(v) = &self.database_url {
            settings.database_url = normalize_database_url(v);
        }
        if let Some(v) = &self.faucet_url {
            settings.faucet_url = v.clone();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli.settings)?;
    cli.apply(&mut settings);
    let faucet = Url::parse(&settings.faucet_url)
        .with_context(|| format!("invalid faucet url '{}'", settings.faucet_url))?;

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(512);
    let backend = spawn_backend_thread(
        BackendConfig {
            settings,
            ephemeral: cli.ephemeral,
        },
        cmd_rx,
        ui_tx,
    );
    let renderer = thread::spawn(move || screens::render_loop(ui_rx, faucet));

    println!("{}", screens::HELP);
    let mut status = String::new();
    dispatch_backend_command(&cmd_tx, BackendCommand::Initialize, &mut status);

    let mut form = TransferForm::default();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        match parse_line(&line) {
            Ok(ShellInput::Command(cmd)) => dispatch_backend_command(&cmd_tx, cmd, &mut status),
            Ok(ShellInput::Edit(field, value)) => match form.set_field(&field, value) {
                Ok(()) => println!("{}", screens::render_form(&form)),
                Err(message) => status = message,
            },
            Ok(ShellInput::SubmitTransfer) => {
                if form.can_submit() {
                    let cmd = BackendCommand::Transfer {
                        to: form.to_address.trim().to_string(),
                        amount: form.to_amount.trim().to_string(),
                    };
                    dispatch_backend_command(&cmd_tx, cmd, &mut status);
                } else {
                    status = "Transfer disabled: set a recipient (`to`) and an amount".to_string();
                }
            }
            Ok(ShellInput::ShowForm) => println!("{}", screens::render_form(&form)),
            Ok(ShellInput::Help) => println!("{}", screens::HELP),
            Ok(ShellInput::Quit) => break,
            Ok(ShellInput::Empty) => {}
            Err(message) => status = message,
        }
        if !status.is_empty() {
            println!("! {status}");
            status.clear();
        }
    }

    drop(cmd_tx);
    if backend.join().is_err() {
        tracing::error!("backend worker panicked");
    }
    if renderer.join().is_err() {
        tracing::error!("renderer panicked");
    }
    Ok(())
}
