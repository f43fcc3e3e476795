//! Subscription lifecycle management.
//!
//! This module owns the GENA eventing state of a client:
//! - Creating subscriptions and sharing one lease between listeners
//! - Starting the callback server on first subscribe and stopping it when
//!   the last subscription drains
//! - Timer-driven lease renewal and teardown on renewal failure
//! - Dispatching accepted notifications to listeners

mod property;
mod subscription;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use callback_server::{CallbackServer, NotificationPayload};
use soap_client::SoapError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::client::Inner;
use crate::error::{ClientError, Result};
use crate::event::{ClientEvent, Listener, ListenerHandle, ServiceEvent};

use property::parse_property_set;
use subscription::{notify_listeners, Subscription};

/// Eventing state of one client.
///
/// Everything lives behind one mutex: the callback server, the dispatcher
/// task, and the subscription map. Holding the lock across server start and
/// SUBSCRIBE requests is what serializes racing subscribe/unsubscribe/renewal
/// transitions, and makes "server running iff subscriptions non-empty"
/// checkable at every unlock.
pub(crate) struct Eventing {
    pub(crate) state: Mutex<EventingState>,
    next_handle: AtomicU64,
}

#[derive(Default)]
pub(crate) struct EventingState {
    pub(crate) server: Option<CallbackServer>,
    pub(crate) dispatch_task: Option<JoinHandle<()>>,
    pub(crate) subscriptions: HashMap<String, Subscription>,
}

impl Eventing {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EventingState::default()),
            next_handle: AtomicU64::new(1),
        }
    }

    fn next_handle(&self) -> ListenerHandle {
        ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }
}

/// Register a listener for a service, establishing a lease if none exists.
pub(crate) async fn subscribe(
    inner: &Arc<Inner>,
    service_id: &str,
    event_url: Url,
    listener: Listener,
) -> Result<ListenerHandle> {
    let mut state = inner.eventing.state.lock().await;

    // An active lease is shared: append the listener, no network traffic.
    if let Some(sub) = state.subscriptions.get_mut(service_id) {
        let handle = inner.eventing.next_handle();
        sub.listeners.push((handle, listener));
        debug!(service_id, "added listener to existing subscription");
        return Ok(handle);
    }

    if state.server.is_none() {
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let server = CallbackServer::bind(inner.config.callback_port, notification_tx)
            .await
            .map_err(|e| ClientError::Subscription(e.to_string()))?;
        let dispatch_task = tokio::spawn(dispatch_loop(Arc::downgrade(inner), notification_rx));
        state.server = Some(server);
        state.dispatch_task = Some(dispatch_task);
    }

    let (callback_url, router) = match &state.server {
        Some(server) => (server.callback_url_for(service_id), server.router().clone()),
        None => {
            return Err(ClientError::Subscription(
                "eventing server unavailable".to_string(),
            ))
        }
    };

    match inner
        .soap
        .subscribe(&event_url, &callback_url, inner.config.lease_seconds)
        .await
    {
        Ok(response) => {
            router
                .register(service_id.to_string(), response.sid.clone())
                .await;

            let mut sub = Subscription::new(response.sid.clone(), event_url);
            let handle = inner.eventing.next_handle();
            sub.listeners.push((handle, listener));
            sub.renew_task = Some(spawn_renewal(
                inner,
                service_id.to_string(),
                inner.config.renewal_delay(response.timeout_seconds),
            ));
            state.subscriptions.insert(service_id.to_string(), sub);

            debug!(
                service_id,
                sid = %response.sid,
                granted = response.timeout_seconds,
                "subscription established"
            );
            let _ = inner.client_events.send(ClientEvent::SubscriptionEstablished {
                service_id: service_id.to_string(),
                sid: response.sid,
            });
            Ok(handle)
        }
        Err(err) => {
            // The server was started for this subscription alone; take it
            // back down so the lifecycle invariant holds.
            if state.subscriptions.is_empty() {
                stop_server(&mut state).await;
            }
            Err(match err {
                SoapError::Network(msg) => ClientError::Transport(msg),
                other => ClientError::Subscription(other.to_string()),
            })
        }
    }
}

/// Remove a listener; tears down the lease when it was the last one.
///
/// Silent no-op when the service has no subscription or the handle is not
/// registered for it. Never surfaces an error: the subscription state and
/// timer are gone even when the device cannot be told.
pub(crate) async fn unsubscribe(inner: &Arc<Inner>, service_id: &str, handle: ListenerHandle) {
    let mut state = inner.eventing.state.lock().await;

    let Some(sub) = state.subscriptions.get_mut(service_id) else {
        return;
    };
    let before = sub.listeners.len();
    sub.listeners.retain(|(h, _)| *h != handle);
    if sub.listeners.len() == before {
        return;
    }
    if !sub.listeners.is_empty() {
        debug!(service_id, "listener removed, lease still shared");
        return;
    }

    let Some(mut sub) = state.subscriptions.remove(service_id) else {
        return;
    };
    sub.clear_timer();
    if let Some(server) = &state.server {
        server.router().unregister(service_id).await;
    }

    if let Err(err) = inner.soap.unsubscribe(&sub.event_url, &sub.sid).await {
        warn!(service_id, error = %err, "UNSUBSCRIBE failed during teardown");
    }
    debug!(service_id, sid = %sub.sid, "subscription removed");
    let _ = inner.client_events.send(ClientEvent::SubscriptionRemoved {
        service_id: service_id.to_string(),
    });

    if state.subscriptions.is_empty() {
        stop_server(&mut state).await;
    }
}

/// Drop all subscriptions and close the server unconditionally.
///
/// No UNSUBSCRIBE requests are sent: the client is going away and no further
/// traffic is expected. Safe to call more than once.
pub(crate) async fn dispose(inner: &Arc<Inner>) {
    let mut state = inner.eventing.state.lock().await;
    for (service_id, mut sub) in state.subscriptions.drain() {
        sub.clear_timer();
        debug!(service_id = %service_id, "dropping subscription on dispose");
    }
    stop_server(&mut state).await;
}

async fn stop_server(state: &mut EventingState) {
    if let Some(server) = state.server.take() {
        server.shutdown().await;
    }
    if let Some(task) = state.dispatch_task.take() {
        task.abort();
    }
}

/// Arm the renewal timer for one subscription.
///
/// The task holds only a weak reference to the client internals: it exits on
/// its own when the client is dropped, and is aborted on unsubscribe.
fn spawn_renewal(inner: &Arc<Inner>, service_id: String, initial_delay: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    tokio::spawn(async move {
        let mut delay = initial_delay;
        loop {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            match renew_once(&inner, &service_id).await {
                Some(next_delay) => delay = next_delay,
                None => return,
            }
        }
    })
}

/// One renewal attempt. Returns the delay until the next attempt, or `None`
/// when the subscription is gone and the timer task should stop.
async fn renew_once(inner: &Arc<Inner>, service_id: &str) -> Option<Duration> {
    let mut state = inner.eventing.state.lock().await;
    let (event_url, sid) = match state.subscriptions.get(service_id) {
        Some(sub) => (sub.event_url.clone(), sub.sid.clone()),
        None => return None,
    };

    match inner
        .soap
        .renew(&event_url, &sid, inner.config.lease_seconds)
        .await
    {
        Ok(response) => {
            if response.sid != sid {
                // The device reissued the lease identifier. Notifications
                // carrying the old SID were accepted up to this point.
                if let Some(server) = &state.server {
                    server
                        .router()
                        .update_sid(service_id, response.sid.clone())
                        .await;
                }
                if let Some(sub) = state.subscriptions.get_mut(service_id) {
                    sub.sid = response.sid.clone();
                }
            }
            debug!(
                service_id,
                sid = %response.sid,
                granted = response.timeout_seconds,
                "subscription renewed"
            );
            let _ = inner.client_events.send(ClientEvent::SubscriptionRenewed {
                service_id: service_id.to_string(),
                sid: response.sid,
            });
            Some(inner.config.renewal_delay(response.timeout_seconds))
        }
        Err(err) => {
            // The lease is unrecoverable (a 412 means it already expired
            // device-side). Tear down and let the application decide whether
            // to resubscribe.
            warn!(service_id, error = %err, "renewal failed, dropping subscription");
            let listeners = match state.subscriptions.remove(service_id) {
                Some(mut sub) => {
                    // This task is the timer; dropping the handle is enough.
                    sub.renew_task.take();
                    std::mem::take(&mut sub.listeners)
                }
                None => Vec::new(),
            };
            if let Some(server) = &state.server {
                server.router().unregister(service_id).await;
            }
            if state.subscriptions.is_empty() {
                stop_server(&mut state).await;
            }
            drop(state);

            let reason = err.to_string();
            notify_listeners(
                &listeners,
                &ServiceEvent::SubscriptionLost {
                    reason: reason.clone(),
                },
            );
            let _ = inner.client_events.send(ClientEvent::SubscriptionLost {
                service_id: service_id.to_string(),
                reason,
            });
            None
        }
    }
}

/// Consume accepted notifications and fan them out to listeners.
///
/// Listeners are invoked outside the eventing lock, so a listener may call
/// back into the client.
async fn dispatch_loop(
    weak: Weak<Inner>,
    mut notifications: mpsc::UnboundedReceiver<NotificationPayload>,
) {
    while let Some(notification) = notifications.recv().await {
        let Some(inner) = weak.upgrade() else { return };

        let Some(properties) = parse_property_set(&notification.event_xml) else {
            warn!(
                service_id = %notification.service_id,
                "dropping unparsable event notification"
            );
            continue;
        };

        let listeners = {
            let state = inner.eventing.state.lock().await;
            match state.subscriptions.get(&notification.service_id) {
                Some(sub) => sub.listeners.clone(),
                None => continue,
            }
        };

        debug!(
            service_id = %notification.service_id,
            variables = properties.len(),
            "dispatching event"
        );
        notify_listeners(&listeners, &ServiceEvent::PropertyChange(properties));
    }
}
