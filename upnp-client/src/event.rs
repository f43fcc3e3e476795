//! Event payloads delivered to service listeners and the client event channel.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Payload delivered to listeners registered with
/// [`DeviceClient::subscribe`](crate::DeviceClient::subscribe).
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    /// A GENA property-change set: state variable name → new value
    PropertyChange(BTreeMap<String, String>),
    /// The subscription backing this listener was lost and will not recover
    /// on its own; resubscribe to keep receiving events
    SubscriptionLost {
        /// Why the lease could not be kept alive
        reason: String,
    },
}

/// A service event listener callback.
pub type Listener = Arc<dyn Fn(ServiceEvent) + Send + Sync>;

/// Copyable token identifying one registered listener.
///
/// Returned by `subscribe` and passed back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub(crate) u64);

/// Out-of-band client lifecycle events.
///
/// Background work (lease renewal in particular) has no waiting caller, so
/// its outcomes are reported here. The receiver is claimed once via
/// [`DeviceClient::take_events`](crate::DeviceClient::take_events).
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A new subscription lease was established
    SubscriptionEstablished {
        service_id: String,
        sid: String,
    },
    /// A lease was renewed before expiry
    SubscriptionRenewed {
        service_id: String,
        sid: String,
    },
    /// A subscription was removed by the last listener unsubscribing
    SubscriptionRemoved {
        service_id: String,
    },
    /// A lease could not be renewed and the subscription was dropped
    SubscriptionLost {
        service_id: String,
        reason: String,
    },
}
