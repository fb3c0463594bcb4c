use super::EventKey;
use serde_json::Value;
use std::fmt;

/// Validation errors for inbound messages
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NotAnObject,
    MissingFields,
    InvalidEventFormat,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NotAnObject => write!(f, "Received message was not an object."),
            ValidationError::MissingFields => {
                write!(f, "Received message did not have expected fields.")
            }
            ValidationError::InvalidEventFormat => {
                write!(f, "Received message event field has invalid format.")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a decoded websocket message.
///
/// Validation rules, checked in order:
/// - Message must be a JSON object (not array, string, null, etc.)
/// - Required fields: data, event (data may be any value, including null)
/// - Event format: a string "<channel>:<event>" with both parts non-empty
pub fn validate_message(message: &Value) -> Result<(), ValidationError> {
    let Some(fields) = message.as_object() else {
        return Err(ValidationError::NotAnObject);
    };

    if !fields.contains_key("data") || !fields.contains_key("event") {
        return Err(ValidationError::MissingFields);
    }

    match fields.get("event").and_then(Value::as_str) {
        Some(event) if is_valid_event_key(event) => Ok(()),
        _ => Err(ValidationError::InvalidEventFormat),
    }
}

fn is_valid_event_key(event: &str) -> bool {
    EventKey::parse(event).is_some()
}
