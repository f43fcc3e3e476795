//! Routing of inbound NOTIFY requests by callback path.
//!
//! This module provides the `EventRouter` which maintains the table of
//! registered callback paths (one per subscribed service) together with the
//! SID each path currently expects, and forwards accepted notifications to a
//! channel.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// An accepted UPnP event notification.
///
/// Contains the serviceId extracted from the callback path, the SID the
/// device presented, and the raw XML property-set body. Parsing the body is
/// the consumer's concern.
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    /// The serviceId from the callback path
    pub service_id: String,
    /// The subscription ID from the NOTIFY SID header
    pub sid: String,
    /// The raw XML event body
    pub event_xml: String,
}

/// Decision made for an inbound NOTIFY request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The notification was accepted and forwarded to the channel
    Delivered,
    /// No registration exists for the callback path
    UnknownService,
    /// The presented SID does not match the registered one
    SidMismatch,
}

/// Routes events from HTTP callbacks to a channel.
///
/// The router holds one entry per subscribed service: the serviceId used as
/// the callback path segment, mapped to the SID the device was granted. An
/// inbound NOTIFY is forwarded only when both match.
#[derive(Clone)]
pub struct EventRouter {
    /// Registered callback paths: serviceId → expected SID
    routes: Arc<RwLock<HashMap<String, String>>>,
    /// Channel for forwarding accepted notifications
    event_sender: mpsc::UnboundedSender<NotificationPayload>,
}

impl EventRouter {
    /// Create a new event router forwarding to the given channel.
    pub fn new(event_sender: mpsc::UnboundedSender<NotificationPayload>) -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            event_sender,
        }
    }

    /// Register a callback path with the SID it expects.
    pub async fn register(&self, service_id: String, sid: String) {
        let mut routes = self.routes.write().await;
        routes.insert(service_id, sid);
    }

    /// Replace the expected SID for an already-registered path.
    ///
    /// No-op when the path is not registered; the old SID keeps matching
    /// until this call completes, so notifications racing a lease renewal are
    /// still delivered.
    pub async fn update_sid(&self, service_id: &str, sid: String) {
        let mut routes = self.routes.write().await;
        if let Some(expected) = routes.get_mut(service_id) {
            *expected = sid;
        }
    }

    /// Remove a callback path registration.
    pub async fn unregister(&self, service_id: &str) {
        let mut routes = self.routes.write().await;
        routes.remove(service_id);
    }

    /// Decide an inbound notification and forward it if accepted.
    pub async fn route(&self, service_id: &str, sid: &str, event_xml: String) -> RouteOutcome {
        let routes = self.routes.read().await;
        match routes.get(service_id) {
            None => RouteOutcome::UnknownService,
            Some(expected) if expected != sid => RouteOutcome::SidMismatch,
            Some(_) => {
                let payload = NotificationPayload {
                    service_id: service_id.to_string(),
                    sid: sid.to_string(),
                    event_xml,
                };
                // Ignore send errors if the receiver is gone; the server is
                // shutting down anyway.
                let _ = self.event_sender.send(payload);
                RouteOutcome::Delivered
            }
        }
    }
}
