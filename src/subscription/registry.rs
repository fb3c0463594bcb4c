use crate::message::{EventKey, EVENT_KEY_SEPARATOR};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Function invoked with the `data` of every message routed to its (channel, event) pair
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Rejected subscription arguments
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionError {
    EmptyChannel,
    EmptyEvent,
    SeparatorInChannel(String),
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::EmptyChannel => write!(f, "channel must not be empty"),
            SubscriptionError::EmptyEvent => write!(f, "event must not be empty"),
            SubscriptionError::SeparatorInChannel(channel) => write!(
                f,
                "channel '{}' must not contain '{}'",
                channel, EVENT_KEY_SEPARATOR
            ),
        }
    }
}

impl std::error::Error for SubscriptionError {}

/// Why a valid message found no callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMiss {
    UnknownChannel,
    UnknownEvent,
}

/// Result of invoking the callbacks for one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Callbacks that returned normally
    pub invoked: usize,
    /// Callbacks that panicked
    pub failed: usize,
}

/// Registry of callbacks keyed by channel, then event.
///
/// Channel and event entries are created lazily on the first subscribe and
/// are never removed, so an entry exists iff it holds at least one callback.
#[derive(Default)]
pub struct SubscriptionRegistry {
    channels: HashMap<String, HashMap<String, Vec<Callback>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback for `channel:event`. Repeated registrations of the
    /// same function are kept; invocation order is registration order.
    pub fn subscribe(
        &mut self,
        channel: &str,
        event: &str,
        callback: Callback,
    ) -> Result<(), SubscriptionError> {
        if channel.is_empty() {
            return Err(SubscriptionError::EmptyChannel);
        }
        if event.is_empty() {
            return Err(SubscriptionError::EmptyEvent);
        }
        // Keys are split on the first separator, so this channel could never match
        if channel.contains(EVENT_KEY_SEPARATOR) {
            return Err(SubscriptionError::SeparatorInChannel(channel.to_string()));
        }

        self.channels
            .entry(channel.to_string())
            .or_default()
            .entry(event.to_string())
            .or_default()
            .push(callback);

        Ok(())
    }

    /// Snapshot of the callbacks registered for `key`, in registration order
    pub fn lookup(&self, key: &EventKey) -> Result<Vec<Callback>, RouteMiss> {
        let events = self
            .channels
            .get(&key.channel)
            .ok_or(RouteMiss::UnknownChannel)?;
        let callbacks = events.get(&key.event).ok_or(RouteMiss::UnknownEvent)?;
        Ok(callbacks.clone())
    }

    #[cfg(test)]
    fn has_channel(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    #[cfg(test)]
    fn has_event(&self, channel: &str, event: &str) -> bool {
        self.channels
            .get(channel)
            .map_or(false, |events| events.contains_key(event))
    }

    pub fn callback_count(&self, channel: &str, event: &str) -> usize {
        self.channels
            .get(channel)
            .and_then(|events| events.get(event))
            .map_or(0, Vec::len)
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (channel, events) in &self.channels {
            for (event, callbacks) in events {
                map.entry(&format!("{}:{}", channel, event), &callbacks.len());
            }
        }
        map.finish()
    }
}

/// Invoke each callback in order with `data`.
///
/// A panicking callback is logged and counted; the remaining callbacks still run.
pub fn dispatch(key: &EventKey, callbacks: &[Callback], data: &Value) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for (index, callback) in callbacks.iter().enumerate() {
        match panic::catch_unwind(AssertUnwindSafe(|| callback(data))) {
            Ok(()) => summary.invoked += 1,
            Err(_) => {
                error!(event = %key, callback = index, "Subscriber callback panicked");
                summary.failed += 1;
            }
        }
    }

    summary
}
