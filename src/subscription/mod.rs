// Channel/event subscription registry and inbound message routing

pub mod registry;
pub mod router;

pub use registry::{Callback, DispatchSummary, RouteMiss, SubscriptionError, SubscriptionRegistry};
pub use router::{MessageRouter, RouteOutcome};
