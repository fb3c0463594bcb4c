// SOS websocket client: owns the subscription registry and the connection task

mod connection;
mod error;

pub use error::ClientError;

use crate::config::ClientConfig;
use crate::subscription::MessageRouter;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::http::Uri;
use tracing::{info, warn};

/// Lifecycle of the client's websocket connection.
///
/// `Uninitialized -> Connecting -> Open -> {Closed, Error}`, then back to
/// `Connecting` after the retry interval. `Closed` is also the final state
/// after shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Open,
    Closed,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Handle to the running connection task
struct Connection {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// SosClient connects to the websocket server run by the SOS plugin and
/// dispatches each `channel:event` message to the callbacks subscribed to it.
///
/// Dropping the client stops its connection task.
pub struct SosClient {
    router: MessageRouter,
    state_tx: Option<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    connection: Option<Connection>,
}

impl SosClient {
    pub const DEFAULT_RETRY_INTERVAL_SECONDS: f64 = 3.0;

    pub fn new() -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Uninitialized);
        Self {
            router: MessageRouter::new(),
            state_tx: Some(state_tx),
            state_rx,
            connection: None,
        }
    }

    /// Start connecting to `uri`, retrying `retry_interval_seconds` after
    /// every failed or closed connection.
    ///
    /// Returns once the connection task is spawned; must be called from
    /// within a tokio runtime.
    pub fn init(&mut self, uri: &str, retry_interval_seconds: f64) -> Result<(), ClientError> {
        if self.connection.is_some() {
            return Err(ClientError::AlreadyInitialized);
        }

        let retry_interval = parse_retry_interval(retry_interval_seconds)?;
        validate_uri(uri)?;
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        let state_tx = self.state_tx.take().ok_or(ClientError::AlreadyInitialized)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = runtime.spawn(connection::run_connection(
            uri.to_string(),
            retry_interval,
            self.router.clone(),
            state_tx,
            shutdown_rx,
        ));

        info!(uri = %uri, retry_interval_seconds, "SOS client initialized");
        self.connection = Some(Connection { shutdown_tx, task });
        Ok(())
    }

    /// `init` with the default 3 second retry interval
    pub fn init_default(&mut self, uri: &str) -> Result<(), ClientError> {
        self.init(uri, Self::DEFAULT_RETRY_INTERVAL_SECONDS)
    }

    pub fn init_with_config(&mut self, config: &ClientConfig) -> Result<(), ClientError> {
        self.init(&config.uri, config.retry_interval_seconds)
    }

    /// Register `callback` to receive the `data` of every `channel:event` message.
    ///
    /// Repeated calls add further callbacks; nothing is deduplicated.
    pub fn subscribe<F>(&self, channel: &str, event: &str, callback: F) -> Result<(), ClientError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.router.subscribe(channel, event, callback)?;
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver for the connection state.
    ///
    /// Only the latest state is kept, so a state that lasts less than one
    /// poll of the receiver (e.g. `Open` before an immediate server close)
    /// may never be observed.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Router shared with the connection task
    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Close the socket and wait for the connection task to finish
    pub async fn shutdown(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        // Receiver is gone only if the task already exited
        let _ = connection.shutdown_tx.send(true);
        if let Err(e) = connection.task.await {
            warn!(error = %e, "Connection task did not shut down cleanly");
        }
    }
}

impl Default for SosClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_retry_interval(seconds: f64) -> Result<Duration, ClientError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| ClientError::InvalidRetryInterval(seconds))
}

fn validate_uri(uri: &str) -> Result<(), ClientError> {
    let parsed: Uri = uri
        .parse()
        .map_err(|_| ClientError::InvalidUri(uri.to_string()))?;

    match parsed.scheme_str() {
        Some("ws") | Some("wss") => {}
        Some(other) => return Err(ClientError::UnsupportedScheme(other.to_string())),
        None => return Err(ClientError::InvalidUri(uri.to_string())),
    }

    if parsed.host().map_or(true, str::is_empty) {
        return Err(ClientError::InvalidUri(uri.to_string()));
    }

    Ok(())
}
