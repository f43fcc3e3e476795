//! Generic UPnP callback server for receiving event notifications.
//!
//! This crate provides a lightweight HTTP server for handling GENA NOTIFY
//! requests. It has no knowledge of service schemas or subscription leases;
//! it only knows which callback paths are registered and which SID each one
//! expects.
//!
//! # Overview
//!
//! - [`CallbackServer`]: HTTP listener bound to a local port, receiving
//!   `NOTIFY /<serviceId>` requests from devices.
//! - [`EventRouter`]: table of registered serviceId → expected SID entries,
//!   deciding per request whether to accept, reject as unknown, or reject as
//!   a SID mismatch.
//! - [`NotificationPayload`]: accepted notification (serviceId, SID, raw XML
//!   body) handed to the consumer over a channel.
//!
//! The server replies to the device before the consumer does anything with
//! the payload, so slow or failing event handlers can never stall NOTIFY
//! delivery.
//!
//! # Example
//!
//! ```no_run
//! use callback_server::{CallbackServer, NotificationPayload};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
//!
//!     // Port 0 binds an ephemeral port.
//!     let server = CallbackServer::bind(0, tx).await.expect("bind failed");
//!     server
//!         .router()
//!         .register("urn:test-1".to_string(), "uuid:abc".to_string())
//!         .await;
//!     println!("callback URL: {}", server.callback_url_for("urn:test-1"));
//!
//!     while let Some(notification) = rx.recv().await {
//!         println!("event for {}: {}", notification.service_id, notification.event_xml);
//!     }
//! }
//! ```

pub mod router;
mod server;

pub use router::{EventRouter, NotificationPayload, RouteOutcome};
pub use server::{CallbackServer, ServerError};
