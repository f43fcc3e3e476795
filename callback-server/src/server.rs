//! HTTP server for receiving UPnP event notifications.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warp::http::StatusCode;
use warp::Filter;

use super::router::{EventRouter, NotificationPayload, RouteOutcome};

/// Errors from starting the callback server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not be bound
    #[error("failed to bind callback listener: {0}")]
    Bind(String),
}

/// HTTP callback server for receiving UPnP event notifications.
///
/// The `CallbackServer` binds a local port and accepts `NOTIFY /<serviceId>`
/// requests. Each request is validated (GENA headers, registered path,
/// matching SID) and accepted notifications are forwarded through an
/// [`EventRouter`] to a channel. The HTTP response is produced by the routing
/// decision alone:
///
/// - `200 OK` — accepted and forwarded
/// - `404 Not Found` — no registration for the callback path
/// - `412 Precondition Failed` — SID does not match the registration
/// - `400 Bad Request` — missing SID or invalid NT/NTS headers
pub struct CallbackServer {
    /// The port the listener is bound to
    port: u16,
    /// The advertised base URL for CALLBACK headers
    base_url: String,
    /// Registration table and channel hand-off
    router: EventRouter,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Listener task handle
    server_handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind the callback listener and start serving.
    ///
    /// Binds `0.0.0.0:<port>`; port 0 requests an ephemeral port. The
    /// advertised base URL uses the local IP address chosen for outbound
    /// traffic, falling back to 127.0.0.1 when no route is available.
    ///
    /// # Arguments
    ///
    /// * `port` - Port to bind, or 0 for an ephemeral one
    /// * `event_sender` - Channel receiving accepted notifications
    pub async fn bind(
        port: u16,
        event_sender: mpsc::UnboundedSender<NotificationPayload>,
    ) -> Result<Self, ServerError> {
        let router = EventRouter::new(event_sender);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let routes = notify_route(router.clone()).recover(handle_rejection);
        let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, async move {
                shutdown_rx.recv().await;
            })
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        let server_handle = tokio::spawn(server);

        let local_ip = detect_local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let base_url = format!("http://{}:{}", local_ip, addr.port());
        info!(%base_url, "callback server listening");

        Ok(Self {
            port: addr.port(),
            base_url,
            router,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// The base URL to advertise in CALLBACK headers.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The full callback URL for one service's subscription.
    pub fn callback_url_for(&self, service_id: &str) -> String {
        format!("{}/{}", self.base_url, service_id)
    }

    /// The registration table for this listener.
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Shut down the listener and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        info!("callback server stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        // Covers the case where the server is dropped without an explicit
        // shutdown: signal the listener and stop waiting for it.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

/// The NOTIFY endpoint: a single path segment naming the subscribed service.
fn notify_route(
    router: EventRouter,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::method()
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::header::optional::<String>("sid"))
        .and(warp::header::optional::<String>("nt"))
        .and(warp::header::optional::<String>("nts"))
        .and(warp::body::bytes())
        .and_then(
            move |method: warp::http::Method,
                  service_id: String,
                  sid: Option<String>,
                  nt: Option<String>,
                  nts: Option<String>,
                  body: bytes::Bytes| {
                let router = router.clone();
                async move {
                    if method.as_str() != "NOTIFY" {
                        return Err(warp::reject::not_found());
                    }

                    if !validate_event_headers(&sid, &nt, &nts) {
                        warn!(%service_id, "rejecting NOTIFY with invalid headers");
                        return Err(warp::reject::custom(InvalidEventHeaders));
                    }

                    let sid = sid.ok_or_else(|| warp::reject::custom(InvalidEventHeaders))?;
                    let event_xml = String::from_utf8_lossy(&body).to_string();
                    debug!(%service_id, %sid, bytes = event_xml.len(), "NOTIFY received");

                    match router.route(&service_id, &sid, event_xml).await {
                        RouteOutcome::Delivered => Ok::<_, warp::Rejection>(
                            warp::reply::with_status("", StatusCode::OK),
                        ),
                        RouteOutcome::UnknownService => Err(warp::reject::not_found()),
                        RouteOutcome::SidMismatch => {
                            warn!(%service_id, %sid, "NOTIFY SID does not match subscription");
                            Err(warp::reject::custom(SidMismatch))
                        }
                    }
                }
            },
        )
}

/// Validate GENA notification headers.
///
/// The SID header is required. NT and NTS are optional but must carry the
/// GENA event values when both are present.
fn validate_event_headers(
    sid: &Option<String>,
    nt: &Option<String>,
    nts: &Option<String>,
) -> bool {
    if sid.is_none() {
        return false;
    }

    if let (Some(nt_val), Some(nts_val)) = (nt, nts) {
        if nt_val != "upnp:event" || nts_val != "upnp:propchange" {
            return false;
        }
    }

    true
}

/// Custom rejection for a NOTIFY whose SID does not match the registration.
#[derive(Debug)]
struct SidMismatch;

impl warp::reject::Reject for SidMismatch {}

/// Custom rejection for missing or invalid GENA headers.
#[derive(Debug)]
struct InvalidEventHeaders;

impl warp::reject::Reject for InvalidEventHeaders {}

/// Map rejections to HTTP responses.
async fn handle_rejection(
    err: warp::Rejection,
) -> Result<impl warp::Reply, std::convert::Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Unknown callback path")
    } else if err.find::<SidMismatch>().is_some() {
        (StatusCode::PRECONDITION_FAILED, "SID mismatch")
    } else if err.find::<InvalidEventHeaders>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid event headers")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(message, code))
}

/// Detect the local IP address used for outbound connections.
///
/// Uses a UDP socket connect to determine routing; no data is sent.
fn detect_local_ip() -> Option<IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let local_addr = socket.local_addr().ok()?;
    Some(local_addr.ip())
}
