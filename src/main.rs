use anyhow::Result;
use serde_json::Value;
use sos_client::{load_config, ClientConfig, SosClient};
use std::path::Path;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "sos-client.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sos_client=info".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH)?,
        None => ClientConfig::default(),
    };

    info!(uri = %config.uri, "SOS client starting...");

    let mut client = SosClient::new();

    // Print each game state update
    client.subscribe("game", "update_state", |data: &Value| {
        match serde_json::to_string_pretty(data) {
            Ok(pretty) => println!("{}", pretty),
            Err(e) => error!(error = %e, "Failed to format update_state"),
        }
    })?;

    client.init_with_config(&config)?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    client.shutdown().await;

    Ok(())
}
