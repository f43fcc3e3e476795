//! End-to-end tests for NOTIFY handling over real HTTP.

use callback_server::{CallbackServer, NotificationPayload};
use tokio::sync::mpsc;

const PROPERTY_SET: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><Volume>20</Volume></e:property>
</e:propertyset>"#;

fn notify_method() -> reqwest::Method {
    reqwest::Method::from_bytes(b"NOTIFY").unwrap()
}

/// NOTIFY URL against the loopback interface; the listener binds 0.0.0.0 so
/// the advertised base URL is not needed here.
fn local_notify_url(server: &CallbackServer, service_id: &str) -> String {
    format!("http://127.0.0.1:{}/{}", server.port(), service_id)
}

async fn send_notify(
    url: &str,
    sid: &str,
    body: &str,
) -> reqwest::Response {
    reqwest::Client::new()
        .request(notify_method(), url)
        .header("NT", "upnp:event")
        .header("NTS", "upnp:propchange")
        .header("SID", sid)
        .body(body.to_string())
        .send()
        .await
        .expect("NOTIFY request failed")
}

#[tokio::test]
async fn notify_is_accepted_and_forwarded() {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
    let server = CallbackServer::bind(0, tx).await.unwrap();
    server
        .router()
        .register("urn:test-1".to_string(), "uuid:abc".to_string())
        .await;

    let response = send_notify(
        &local_notify_url(&server, "urn:test-1"),
        "uuid:abc",
        PROPERTY_SET,
    )
    .await;
    assert_eq!(response.status(), 200);

    let payload = rx.recv().await.unwrap();
    assert_eq!(payload.service_id, "urn:test-1");
    assert_eq!(payload.sid, "uuid:abc");
    assert!(payload.event_xml.contains("<Volume>20</Volume>"));

    server.shutdown().await;
}

#[tokio::test]
async fn notify_with_mismatched_sid_is_rejected() {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
    let server = CallbackServer::bind(0, tx).await.unwrap();
    server
        .router()
        .register("urn:test-1".to_string(), "uuid:abc".to_string())
        .await;

    let response = send_notify(
        &local_notify_url(&server, "urn:test-1"),
        "uuid:stale",
        PROPERTY_SET,
    )
    .await;
    assert_eq!(response.status(), 412);
    assert!(rx.try_recv().is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn notify_for_unknown_path_is_rejected() {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
    let server = CallbackServer::bind(0, tx).await.unwrap();

    let response = send_notify(
        &local_notify_url(&server, "urn:unknown"),
        "uuid:abc",
        PROPERTY_SET,
    )
    .await;
    assert_eq!(response.status(), 404);
    assert!(rx.try_recv().is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn notify_without_sid_is_a_bad_request() {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
    let server = CallbackServer::bind(0, tx).await.unwrap();
    server
        .router()
        .register("urn:test-1".to_string(), "uuid:abc".to_string())
        .await;

    let response = reqwest::Client::new()
        .request(notify_method(), local_notify_url(&server, "urn:test-1"))
        .header("NT", "upnp:event")
        .header("NTS", "upnp:propchange")
        .body(PROPERTY_SET.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(rx.try_recv().is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn non_notify_methods_are_not_served() {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
    let server = CallbackServer::bind(0, tx).await.unwrap();
    server
        .router()
        .register("urn:test-1".to_string(), "uuid:abc".to_string())
        .await;

    let response = reqwest::Client::new()
        .post(local_notify_url(&server, "urn:test-1"))
        .header("SID", "uuid:abc")
        .body(PROPERTY_SET.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert!(rx.try_recv().is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_the_listener() {
    let (tx, _rx) = mpsc::unbounded_channel::<NotificationPayload>();
    let server = CallbackServer::bind(0, tx).await.unwrap();
    let url = local_notify_url(&server, "urn:test-1");

    server.shutdown().await;

    let result = reqwest::Client::new()
        .request(notify_method(), &url)
        .header("SID", "uuid:abc")
        .body(PROPERTY_SET.to_string())
        .send()
        .await;
    assert!(result.is_err());
}
