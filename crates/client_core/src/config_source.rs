use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const DEFAULT_CONFIG_URL: &str = "https://wallet.matic.today/addresses.json";

/// Where the published network document comes from.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch_document(&self) -> Result<Value>;
}

pub struct HttpConfigSource {
    http: Client,
    url: Url,
}

impl HttpConfigSource {
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build config http client")?;
        Ok(Self { http, url })
    }

    pub fn with_client(http: Client, url: Url) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch_document(&self) -> Result<Value> {
        debug!(url = %self.url, "fetching network document");
        self.http
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.url))?
            .json::<Value>()
            .await
            .with_context(|| format!("{} did not return a JSON document", self.url))
    }
}

pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_document(&self) -> Result<Value> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a JSON document", self.path.display()))
    }
}

/// Fixed document, for tests and offline runs.
pub struct StaticConfigSource {
    document: Value,
}

impl StaticConfigSource {
    pub fn new(document: Value) -> Self {
        Self { document }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    fn describe(&self) -> String {
        "static document".to_string()
    }

    async fn fetch_document(&self) -> Result<Value> {
        Ok(self.document.clone())
    }
}

#[cfg(test)]
#[path = "tests/config_source_tests.rs"]
mod tests;
