use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Websocket endpoint of the SOS plugin
    #[serde(default = "default_uri")]
    pub uri: String,
    /// Seconds to wait before reconnecting after a failed or closed connection
    #[serde(default = "default_retry_interval_seconds")]
    pub retry_interval_seconds: f64,
}

fn default_uri() -> String {
    "ws://localhost:49122".to_string()
}

fn default_retry_interval_seconds() -> f64 {
    3.0
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            retry_interval_seconds: default_retry_interval_seconds(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ClientConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}
