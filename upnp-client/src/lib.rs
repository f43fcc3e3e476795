//! UPnP control-point client.
//!
//! Given a device description URL, this crate discovers the device's
//! services and their schemas, invokes remote SOAP actions, and maintains
//! live GENA event subscriptions delivering state-change notifications to
//! application listeners.
//!
//! # Overview
//!
//! - [`DeviceClient`]: the facade. Construct one per device description URL.
//! - [`DeviceDescription`] / [`ServiceDescription`]: parsed description
//!   documents, cached on the client and shared as `Arc`s.
//! - [`DeviceClient::call_action`]: SOAP 1.1 invocation validated against
//!   the cached service schema, with SOAP faults decoded into
//!   [`ClientError::ActionFault`].
//! - [`DeviceClient::subscribe`] / [`DeviceClient::unsubscribe`]: GENA
//!   eventing. The first subscription lazily starts a local callback HTTP
//!   server; listeners on the same service share one lease; leases are
//!   renewed in the background and the server is torn down when the last
//!   subscription drains.
//!
//! Background failures (a lease that cannot be renewed) are reported to the
//! affected listeners as [`ServiceEvent::SubscriptionLost`] and to the
//! client-wide channel claimed via [`DeviceClient::take_events`].
//!
//! Device discovery is out of scope: the caller supplies a reachable
//! description URL (from SSDP, configuration, or elsewhere).
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use upnp_client::DeviceClient;
//!
//! #[tokio::main]
//! async fn main() -> upnp_client::Result<()> {
//!     let client = DeviceClient::new("http://192.168.1.50:1400/description.xml")?;
//!
//!     let device = client.device_description().await?;
//!     for (service_id, service) in &device.services {
//!         println!("{service_id}: {}", service.service_type);
//!     }
//!
//!     let outputs = client
//!         .call_action(
//!             "urn:upnp-org:serviceId:RenderingControl",
//!             "GetVolume",
//!             &HashMap::from([("Channel".to_string(), "Master".to_string())]),
//!         )
//!         .await?;
//!     println!("volume: {}", outputs["CurrentVolume"]);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
pub mod description;
mod error;
mod event;
mod eventing;

pub use client::DeviceClient;
pub use config::ClientConfig;
pub use description::{
    Action, Argument, DeviceDescription, Icon, Service, ServiceDescription, StateVariable,
};
pub use error::{ClientError, Result};
pub use event::{ClientEvent, Listener, ListenerHandle, ServiceEvent};
