use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config_source::DEFAULT_CONFIG_URL, ConfigSource, FileConfigSource, HttpConfigSource,
};
use shared::network::{NetworkConfig, DEFAULT_NETWORK_ENV};
use storage::{KeyValueStore, Storage, LOGGED_IN_KEY};
use url::Url;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/wallet_shell.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a network document and print the validated environment.
    InspectConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_URL, conflicts_with = "file")]
        url: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_NETWORK_ENV)]
        env: String,
    },
    /// Print the stored session marker.
    ShowFlag,
    /// Remove the stored session marker.
    ClearFlag,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::InspectConfig { url, file, env } => {
            let source: Box<dyn ConfigSource> = match file {
                Some(path) => Box::new(FileConfigSource::new(path)),
                None => {
                    let url = Url::parse(&url).with_context(|| format!("invalid url '{url}'"))?;
                    Box::new(HttpConfigSource::new(url, Duration::from_secs(20))?)
                }
            };
            let document = source.fetch_document().await?;
            println!(
                "environments in {}: {}",
                source.describe(),
                NetworkConfig::environments(&document).join(", ")
            );
            let config = NetworkConfig::from_document(&document, &env)
                .with_context(|| format!("environment '{env}' is not usable"))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::ShowFlag => {
            let storage = Storage::new(&cli.database_url).await?;
            match storage.get(LOGGED_IN_KEY).await? {
                Some(value) => {
                    let since = storage
                        .updated_at(LOGGED_IN_KEY)
                        .await?
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_default();
                    println!("{LOGGED_IN_KEY}={value} {since}");
                }
                None => println!("{LOGGED_IN_KEY} is not set"),
            }
        }
        Command::ClearFlag => {
            let storage = Storage::new(&cli.database_url).await?;
            storage.remove(LOGGED_IN_KEY).await?;
            println!("cleared {LOGGED_IN_KEY}");
        }
    }

    Ok(())
}
