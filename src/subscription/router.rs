use crate::message::{InboundMessage, MessageError};
use crate::subscription::registry::{
    self, DispatchSummary, RouteMiss, SubscriptionError, SubscriptionRegistry,
};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// What happened to one inbound frame
#[derive(Debug)]
pub enum RouteOutcome {
    /// Message was valid and its callbacks (possibly none) were invoked
    Dispatched(DispatchSummary),
    /// Message failed decoding or validation and was discarded
    Dropped(MessageError),
}

impl RouteOutcome {
    pub fn is_dropped(&self) -> bool {
        matches!(self, RouteOutcome::Dropped(_))
    }

    /// Number of callbacks that ran to completion
    pub fn invoked(&self) -> usize {
        match self {
            RouteOutcome::Dispatched(summary) => summary.invoked,
            RouteOutcome::Dropped(_) => 0,
        }
    }
}

/// Routes raw socket text to the callbacks registered for its channel:event.
///
/// Cloning is cheap; clones share one registry.
#[derive(Clone, Default)]
pub struct MessageRouter {
    registry: Arc<RwLock<SubscriptionRegistry>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for future messages keyed `channel:event`
    pub fn subscribe<F>(&self, channel: &str, event: &str, callback: F) -> Result<(), SubscriptionError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        registry.subscribe(channel, event, Arc::new(callback))?;
        debug!(channel = %channel, event = %event, "Subscribed");
        Ok(())
    }

    /// Decode, validate, and dispatch one text frame.
    ///
    /// Never fails: malformed frames are logged and dropped.
    pub fn handle_text(&self, text: &str) -> RouteOutcome {
        match InboundMessage::parse(text) {
            Ok(message) => RouteOutcome::Dispatched(self.route(&message)),
            Err(e) => {
                warn!(error = %e, "Dropping inbound message");
                RouteOutcome::Dropped(e)
            }
        }
    }

    /// Dispatch a validated message to its subscribers
    pub fn route(&self, message: &InboundMessage) -> DispatchSummary {
        let key = &message.key;

        // Snapshot under the read lock so callbacks can subscribe without deadlocking
        let lookup = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lookup(key);

        let callbacks = match lookup {
            Ok(callbacks) => callbacks,
            Err(RouteMiss::UnknownChannel) => {
                info!(channel = %key.channel, "Channel does not exist, nothing to dispatch");
                Vec::new()
            }
            Err(RouteMiss::UnknownEvent) => {
                info!(
                    channel = %key.channel,
                    event = %key.event,
                    "Event does not exist in channel, nothing to dispatch"
                );
                Vec::new()
            }
        };

        let summary = registry::dispatch(key, &callbacks, &message.data);
        if summary.failed > 0 {
            warn!(
                event = %key,
                invoked = summary.invoked,
                failed = summary.failed,
                "Some subscribers failed"
            );
        }
        summary
    }

    /// Number of callbacks registered for `channel:event`
    pub fn callback_count(&self, channel: &str, event: &str) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .callback_count(channel, event)
    }
}
