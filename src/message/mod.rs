use serde_json::Value;
use std::fmt;

mod validation;

pub use validation::{validate_message, ValidationError};

/// Separator between channel and event in the wire `event` field.
pub const EVENT_KEY_SEPARATOR: char = ':';

/// Routing target of an inbound message, parsed from `"<channel>:<event>"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub channel: String,
    pub event: String,
}

impl EventKey {
    /// Splits on the first separator. Both halves must be non-empty; the
    /// event half may itself contain the separator.
    pub fn parse(raw: &str) -> Option<Self> {
        let (channel, event) = raw.split_once(EVENT_KEY_SEPARATOR)?;
        if channel.is_empty() || event.is_empty() {
            return None;
        }
        Some(Self {
            channel: channel.to_string(),
            event: event.to_string(),
        })
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.channel, EVENT_KEY_SEPARATOR, self.event)
    }
}

/// InboundMessage is a validated message received from the SOS server.
///
/// Wire format: `{ "data": <any>, "event": "<channel>:<event>" }`.
/// `data` is opaque to this crate and handed to callbacks untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    pub key: EventKey,
    pub data: Value,
}

impl InboundMessage {
    /// Decodes and validates raw text from the socket.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(text).map_err(MessageError::Decode)?;
        Self::from_value(value).map_err(MessageError::Invalid)
    }

    /// Validates an already decoded value and splits its event key.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        validate_message(&value)?;

        let Value::Object(mut fields) = value else {
            return Err(ValidationError::NotAnObject);
        };
        let key = fields
            .get("event")
            .and_then(Value::as_str)
            .and_then(EventKey::parse)
            .ok_or(ValidationError::InvalidEventFormat)?;
        let data = fields.remove("data").unwrap_or(Value::Null);

        Ok(Self { key, data })
    }
}

/// Reasons an inbound frame never reaches the subscription registry
#[derive(Debug)]
pub enum MessageError {
    Decode(serde_json::Error),
    Invalid(ValidationError),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Decode(e) => write!(f, "Received message was not valid JSON: {}", e),
            MessageError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MessageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MessageError::Decode(e) => Some(e),
            MessageError::Invalid(e) => Some(e),
        }
    }
}
