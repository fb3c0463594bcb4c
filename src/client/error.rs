use crate::subscription::SubscriptionError;
use std::fmt;

/// Configuration errors surfaced synchronously by `SosClient`
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    InvalidUri(String),
    UnsupportedScheme(String),
    InvalidRetryInterval(f64),
    InvalidSubscription(SubscriptionError),
    AlreadyInitialized,
    NoRuntime,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidUri(uri) => write!(f, "invalid websocket uri '{}'", uri),
            ClientError::UnsupportedScheme(scheme) => {
                write!(f, "unsupported uri scheme '{}': expected 'ws' or 'wss'", scheme)
            }
            ClientError::InvalidRetryInterval(seconds) => write!(
                f,
                "retry interval must be a finite, non-negative number of seconds, got {}",
                seconds
            ),
            ClientError::InvalidSubscription(e) => write!(f, "invalid subscription: {}", e),
            ClientError::AlreadyInitialized => write!(f, "client is already initialized"),
            ClientError::NoRuntime => write!(f, "init must be called from within a tokio runtime"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::InvalidSubscription(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SubscriptionError> for ClientError {
    fn from(e: SubscriptionError) -> Self {
        ClientError::InvalidSubscription(e)
    }
}
