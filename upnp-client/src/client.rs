//! The device client facade.
//!
//! One `DeviceClient` per device description URL. The client owns the
//! description caches and the eventing state; everything is torn down when
//! the last clone is dropped or `dispose` is called.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use soap_client::SoapClient;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::description::{DeviceDescription, ServiceDescription};
use crate::error::{ClientError, Result};
use crate::event::{ClientEvent, Listener, ListenerHandle, ServiceEvent};
use crate::eventing::{self, Eventing};

/// Shared internals of a client.
pub(crate) struct Inner {
    pub(crate) url: Url,
    pub(crate) config: ClientConfig,
    pub(crate) http: reqwest::Client,
    pub(crate) soap: SoapClient,
    pub(crate) device: RwLock<Option<Arc<DeviceDescription>>>,
    pub(crate) service_descriptions: RwLock<HashMap<String, Arc<ServiceDescription>>>,
    pub(crate) eventing: Eventing,
    pub(crate) client_events: mpsc::UnboundedSender<ClientEvent>,
    client_events_rx: Mutex<Option<mpsc::UnboundedReceiver<ClientEvent>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Last reference gone: cancel background work without waiting. The
        // callback server signals its listener from its own Drop.
        let state = self.eventing.state.get_mut();
        for sub in state.subscriptions.values_mut() {
            sub.clear_timer();
        }
        if let Some(task) = state.dispatch_task.take() {
            task.abort();
        }
        state.server = None;
    }
}

/// A UPnP control-point client for one device.
///
/// Constructed from a device description URL. Offers the description
/// fetchers (cached per client), SOAP action invocation validated against
/// the service schema, and GENA event subscriptions with automatic lease
/// renewal.
///
/// # Example
///
/// ```no_run
/// use upnp_client::{DeviceClient, ServiceEvent};
///
/// #[tokio::main]
/// async fn main() -> upnp_client::Result<()> {
///     let client = DeviceClient::new("http://192.168.1.50:1400/description.xml")?;
///
///     let device = client.device_description().await?;
///     println!("{} ({})", device.friendly_name, device.udn);
///
///     let handle = client
///         .subscribe("urn:upnp-org:serviceId:RenderingControl", |event| {
///             if let ServiceEvent::PropertyChange(properties) = event {
///                 println!("changed: {properties:?}");
///             }
///         })
///         .await?;
///
///     // ... later
///     client
///         .unsubscribe("urn:upnp-org:serviceId:RenderingControl", handle)
///         .await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DeviceClient {
    inner: Arc<Inner>,
}

impl DeviceClient {
    /// Create a client for the given device description URL with default
    /// configuration.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, ClientConfig::default())
    }

    /// Create a client with explicit configuration.
    pub fn with_config(url: &str, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let url = Url::parse(url)
            .map_err(|e| ClientError::Transport(format!("invalid description URL: {e}")))?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;
        let soap = SoapClient::with_timeouts(config.connect_timeout, config.request_timeout)?;

        let (client_events, client_events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            inner: Arc::new(Inner {
                url,
                config,
                http,
                soap,
                device: RwLock::new(None),
                service_descriptions: RwLock::new(HashMap::new()),
                eventing: Eventing::new(),
                client_events,
                client_events_rx: Mutex::new(Some(client_events_rx)),
            }),
        })
    }

    /// The device description URL this client was constructed with.
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Fetch the device description, or return the cached one.
    ///
    /// The description is fetched at most once per client lifetime on the
    /// success path.
    pub async fn device_description(&self) -> Result<Arc<DeviceDescription>> {
        if let Some(description) = self.inner.device.read().await.as_ref() {
            return Ok(description.clone());
        }

        let body = self.get_text(self.inner.url.clone()).await?;
        let description = Arc::new(DeviceDescription::from_xml(&body)?);
        debug!(udn = %description.udn, services = description.services.len(), "device description fetched");

        *self.inner.device.write().await = Some(description.clone());
        Ok(description)
    }

    /// The cached device description, if one has been fetched.
    pub async fn cached_device_description(&self) -> Option<Arc<DeviceDescription>> {
        self.inner.device.read().await.clone()
    }

    /// Fetch a service's SCPD, or return the cached one.
    ///
    /// Fetches the device description first when it is not cached yet. The
    /// SCPDURL is resolved against the description URL.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnknownService`] when the serviceId is not declared by
    /// the device; [`ClientError::Transport`] /
    /// [`ClientError::MalformedDescription`] as for any description fetch.
    pub async fn service_description(&self, service_id: &str) -> Result<Arc<ServiceDescription>> {
        let device = self.device_description().await?;
        let service = device
            .services
            .get(service_id)
            .ok_or_else(|| ClientError::UnknownService(service_id.to_string()))?;

        if let Some(description) = self.inner.service_descriptions.read().await.get(service_id) {
            return Ok(description.clone());
        }

        let scpd_url = self.resolve(&service.scpd_url, "SCPDURL")?;
        let body = self.get_text(scpd_url).await?;
        let description = Arc::new(ServiceDescription::from_xml(&body)?);
        debug!(
            service_id,
            actions = description.actions.len(),
            "service description fetched"
        );

        self.inner
            .service_descriptions
            .write()
            .await
            .insert(service_id.to_string(), description.clone());
        Ok(description)
    }

    /// Invoke a SOAP action and return its output arguments.
    ///
    /// Inputs are taken from `params` by declared argument name; missing
    /// inputs are sent as empty strings, undeclared entries in `params` are
    /// ignored. The result maps each declared output argument to the text of
    /// the corresponding response element.
    ///
    /// # Errors
    ///
    /// [`ClientError::UnknownService`] / [`ClientError::UnknownAction`] for
    /// undeclared targets (no network traffic is attempted),
    /// [`ClientError::ActionFault`] for device-reported SOAP faults, and
    /// [`ClientError::Transport`] for everything transport-shaped.
    pub async fn call_action(
        &self,
        service_id: &str,
        action_name: &str,
        params: &HashMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let device = self.device_description().await?;
        let service = device
            .services
            .get(service_id)
            .ok_or_else(|| ClientError::UnknownService(service_id.to_string()))?
            .clone();

        let schema = self.service_description(service_id).await?;
        let action = schema
            .actions
            .get(action_name)
            .ok_or_else(|| ClientError::UnknownAction(action_name.to_string()))?;

        let arguments: Vec<(String, String)> = action
            .inputs
            .iter()
            .map(|argument| {
                (
                    argument.name.clone(),
                    params.get(&argument.name).cloned().unwrap_or_default(),
                )
            })
            .collect();

        let control_url = self.resolve(&service.control_url, "controlURL")?;
        let response = self
            .inner
            .soap
            .call(&control_url, &service.service_type, action_name, &arguments)
            .await?;

        let mut outputs = BTreeMap::new();
        for argument in &action.outputs {
            let value = response
                .get_child(argument.name.as_str())
                .and_then(|child| child.get_text())
                .map(|text| text.into_owned())
                .unwrap_or_default();
            outputs.insert(argument.name.clone(), value);
        }
        Ok(outputs)
    }

    /// Register a listener for a service's events.
    ///
    /// The first listener for a service establishes a GENA lease (starting
    /// the callback server when none is running); later listeners share it.
    /// The returned handle identifies this registration for `unsubscribe`.
    pub async fn subscribe<F>(&self, service_id: &str, listener: F) -> Result<ListenerHandle>
    where
        F: Fn(ServiceEvent) + Send + Sync + 'static,
    {
        let device = self.device_description().await?;
        let service = device
            .services
            .get(service_id)
            .ok_or_else(|| ClientError::UnknownService(service_id.to_string()))?;
        let event_url = self.resolve(&service.event_sub_url, "eventSubURL")?;

        let listener: Listener = Arc::new(listener);
        eventing::subscribe(&self.inner, service_id, event_url, listener).await
    }

    /// Remove a listener registration.
    ///
    /// Silent no-op when the service has no subscription or the handle is
    /// not registered for it. When the last listener leaves, the lease is
    /// cancelled (best-effort) and the callback server stops if this was the
    /// last subscription. Never fails.
    pub async fn unsubscribe(&self, service_id: &str, handle: ListenerHandle) {
        eventing::unsubscribe(&self.inner, service_id, handle).await;
    }

    /// Claim the out-of-band client event receiver.
    ///
    /// Returns `Some` on the first call and `None` afterwards.
    pub async fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ClientEvent>> {
        self.inner.client_events_rx.lock().await.take()
    }

    /// Whether the eventing callback server is currently listening.
    pub async fn is_listening(&self) -> bool {
        self.inner.eventing.state.lock().await.server.is_some()
    }

    /// The base URL of the running callback server, if any.
    pub async fn eventing_base_url(&self) -> Option<String> {
        self.inner
            .eventing
            .state
            .lock()
            .await
            .server
            .as_ref()
            .map(|server| server.base_url().to_string())
    }

    /// The serviceIds with an active subscription.
    pub async fn subscribed_services(&self) -> Vec<String> {
        self.inner
            .eventing
            .state
            .lock()
            .await
            .subscriptions
            .keys()
            .cloned()
            .collect()
    }

    /// Tear down all eventing state.
    ///
    /// Clears every renewal timer and closes the callback server
    /// unconditionally, without sending UNSUBSCRIBE requests. Safe to call
    /// more than once; the description caches stay usable.
    pub async fn dispose(&self) {
        eventing::dispose(&self.inner).await;
    }

    fn resolve(&self, relative: &str, field: &str) -> Result<Url> {
        self.inner.url.join(relative).map_err(|e| {
            ClientError::MalformedDescription(format!("unresolvable {field} {relative:?}: {e}"))
        })
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        let response = self
            .inner
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::Transport(format!(
                "GET {url} failed: HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}
