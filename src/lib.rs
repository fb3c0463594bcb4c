// Inbound message model and validation
pub mod message;

// Channel/event subscription registry and routing
pub mod subscription;

// Reconnecting websocket client
pub mod client;

// Client configuration
pub mod config;

pub use client::{ClientError, ConnectionState, SosClient};
pub use config::{load_config, ClientConfig};
pub use message::{EventKey, InboundMessage, ValidationError};
