use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use client_core::{
    config_source::DEFAULT_CONFIG_URL, form::DEFAULT_FAUCET_URL, BalanceRefreshPolicy,
};
use serde::Deserialize;
use shared::network::DEFAULT_NETWORK_ENV;

pub const DEFAULT_SETTINGS_FILE: &str = "wallet_shell.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_url: String,
    pub config_file: Option<PathBuf>,
    pub network_env: String,
    pub database_url: String,
    pub faucet_url: String,
    pub refresh_delay_ms: u64,
    pub receipt_poll_interval_ms: u64,
    /// Zero disables receipt polling: the balance reloads after the fixed delay.
    pub receipt_max_polls: u32,
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_url: DEFAULT_CONFIG_URL.into(),
            config_file: None,
            network_env: DEFAULT_NETWORK_ENV.into(),
            database_url: default_database_url(),
            faucet_url: DEFAULT_FAUCET_URL.into(),
            refresh_delay_ms: 1000,
            receipt_poll_interval_ms: 1500,
            receipt_max_polls: 20,
            http_timeout_secs: 20,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    config_url: Option<String>,
    config_file: Option<PathBuf>,
    network_env: Option<String>,
    database_url: Option<String>,
    faucet_url: Option<String>,
    refresh_delay_ms: Option<u64>,
    receipt_poll_interval_ms: Option<u64>,
    receipt_max_polls: Option<u32>,
    http_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn refresh_policy(&self) -> BalanceRefreshPolicy {
        let delay = Duration::from_millis(self.refresh_delay_ms);
        if self.receipt_max_polls == 0 {
            return BalanceRefreshPolicy::FixedDelay(delay);
        }
        BalanceRefreshPolicy::AwaitReceipt {
            initial_delay: delay,
            poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
            max_polls: self.receipt_max_polls,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.config_url {
            self.config_url = v;
        }
        if let Some(v) = file.config_file {
            self.config_file = Some(v);
        }
        if let Some(v) = file.network_env {
            self.network_env = v;
        }
        if let Some(v) = file.database_url {
            self.database_url = v;
        }
        if let Some(v) = file.faucet_url {
            self.faucet_url = v;
        }
        if let Some(v) = file.refresh_delay_ms {
            self.refresh_delay_ms = v;
        }
        if let Some(v) = file.receipt_poll_interval_ms {
            self.receipt_poll_interval_ms = v;
        }
        if let Some(v) = file.receipt_max_polls {
            self.receipt_max_polls = v;
        }
        if let Some(v) = file.http_timeout_secs {
            self.http_timeout_secs = v;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("APP__CONFIG_URL") {
            self.config_url = v;
        }
        if let Some(v) = lookup("APP__CONFIG_FILE") {
            self.config_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("APP__NETWORK_ENV") {
            self.network_env = v;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("APP__DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("APP__FAUCET_URL") {
            self.faucet_url = v;
        }
        if let Some(v) = lookup("APP__REFRESH_DELAY_MS") {
            self.refresh_delay_ms = parse_env("APP__REFRESH_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("APP__RECEIPT_POLL_INTERVAL_MS") {
            self.receipt_poll_interval_ms = parse_env("APP__RECEIPT_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("APP__RECEIPT_MAX_POLLS") {
            self.receipt_max_polls = parse_env("APP__RECEIPT_MAX_POLLS", &v)?;
        }
        if let Some(v) = lookup("APP__HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse_env("APP__HTTP_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{key} must be a non-negative integer, got '{raw}'"))
}

/// Defaults, then the TOML file at `path` (if present), then `APP__*` variables.
pub fn load_settings(path: &Path) -> Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid settings file '{}'", path.display()))?;
            settings.apply_file(file);
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    settings.apply_env(lookup)?;
    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return default_database_url();
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn default_database_url() -> String {
    let path = dirs::data_dir()
        .map(|dir| dir.join("wallet_shell").join("wallet_shell.db"))
        .unwrap_or_else(|| PathBuf::from("./data/wallet_shell.db"));
    format!("sqlite://{}", path.display().to_string().replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
