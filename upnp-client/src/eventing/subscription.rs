//! Per-service subscription state and listener fan-out.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::task::JoinHandle;
use tracing::warn;
use url::Url;

use crate::event::{Listener, ListenerHandle, ServiceEvent};

/// One active GENA subscription, keyed by serviceId in the manager.
///
/// Holds the device-issued lease identifier, the endpoint it targets, the
/// armed renewal timer, and the listeners sharing the lease in registration
/// order.
pub(crate) struct Subscription {
    /// Lease identifier issued by the device
    pub sid: String,
    /// The resolved eventSubURL this lease targets
    pub event_url: Url,
    /// The renewal timer task; aborted on teardown
    pub renew_task: Option<JoinHandle<()>>,
    /// Listeners in registration order = notification fan-out order
    pub listeners: Vec<(ListenerHandle, Listener)>,
}

impl Subscription {
    pub fn new(sid: String, event_url: Url) -> Self {
        Self {
            sid,
            event_url,
            renew_task: None,
            listeners: Vec::new(),
        }
    }

    /// Abort the renewal timer if one is armed.
    pub fn clear_timer(&mut self) {
        if let Some(task) = self.renew_task.take() {
            task.abort();
        }
    }
}

/// Deliver an event to listeners in registration order.
///
/// Each invocation is isolated: a panicking listener is logged and the
/// remaining listeners still run.
pub(crate) fn notify_listeners(listeners: &[(ListenerHandle, Listener)], event: &ServiceEvent) {
    for (handle, listener) in listeners {
        let result = catch_unwind(AssertUnwindSafe(|| listener(event.clone())));
        if result.is_err() {
            warn!(?handle, "event listener panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fan_out_preserves_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut listeners: Vec<(ListenerHandle, Listener)> = Vec::new();
        for i in 0..3u64 {
            let order = order.clone();
            listeners.push((
                ListenerHandle(i),
                Arc::new(move |_| order.lock().unwrap().push(i)),
            ));
        }

        notify_listeners(&listeners, &ServiceEvent::PropertyChange(BTreeMap::new()));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_fan_out() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_after = calls.clone();

        let listeners: Vec<(ListenerHandle, Listener)> = vec![
            (ListenerHandle(0), Arc::new(|_| panic!("listener bug"))),
            (
                ListenerHandle(1),
                Arc::new(move |_| {
                    calls_after.fetch_add(1, Ordering::SeqCst);
                }),
            ),
        ];

        notify_listeners(&listeners, &ServiceEvent::PropertyChange(BTreeMap::new()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
