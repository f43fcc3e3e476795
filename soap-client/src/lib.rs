//! Private SOAP and GENA client for UPnP device communication
//!
//! This crate provides a minimal client for the two outbound request flavors
//! a UPnP control point needs: SOAP 1.1 action invocation against a service's
//! control URL, and the GENA subscription verbs (SUBSCRIBE for initial leases
//! and renewals, UNSUBSCRIBE for teardown).

mod error;

pub use error::SoapError;

use std::time::Duration;

use reqwest::Method;
use tracing::debug;
use url::Url;
use xmltree::Element;

/// Response from a GENA SUBSCRIBE request
#[derive(Debug, Clone)]
pub struct SubscriptionResponse {
    /// Subscription ID returned by the device
    pub sid: String,
    /// Actual lease duration granted by the device (in seconds)
    pub timeout_seconds: u32,
}

/// A minimal SOAP/GENA client for UPnP device communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: reqwest::Client,
}

fn subscribe_method() -> Method {
    Method::from_bytes(b"SUBSCRIBE").unwrap()
}

fn unsubscribe_method() -> Method {
    Method::from_bytes(b"UNSUBSCRIBE").unwrap()
}

impl SoapClient {
    /// Create a new client with default timeouts (5 s connect, 10 s request).
    pub fn new() -> Result<Self, SoapError> {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
    }

    /// Create a new client with explicit connect and whole-request timeouts.
    pub fn with_timeouts(connect: Duration, request: Duration) -> Result<Self, SoapError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(request)
            .build()
            .map_err(|e| SoapError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Invoke a SOAP action and return the parsed `<actionName>Response` element.
    ///
    /// `arguments` are serialized as child elements in the given order, with
    /// values XML-escaped. A SOAP fault in the response body (regardless of
    /// HTTP status) surfaces as [`SoapError::Fault`] carrying the UPnP error
    /// code and description from the fault detail.
    pub async fn call(
        &self,
        control_url: &Url,
        service_type: &str,
        action: &str,
        arguments: &[(String, String)],
    ) -> Result<Element, SoapError> {
        let mut payload = String::new();
        for (name, value) in arguments {
            payload.push_str(&format!("<{name}>{}</{name}>", escape_xml(value)));
        }

        let body = format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
                <s:Body>
                    <u:{action} xmlns:u="{service_type}">{payload}</u:{action}>
                </s:Body>
            </s:Envelope>"#
        );

        let soap_action = format!("\"{}#{}\"", service_type, action);
        debug!(%control_url, action, "sending SOAP request");

        let response = self
            .http
            .post(control_url.clone())
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPACTION", &soap_action)
            .body(body)
            .send()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        let xml = Element::parse(text.as_bytes()).map_err(|e| {
            if status.is_success() {
                SoapError::Parse(e.to_string())
            } else {
                SoapError::Network(format!("action request failed: HTTP {status}"))
            }
        })?;

        if !status.is_success() {
            // Error responses either carry a decodable fault or count as a
            // transport-level failure.
            if let Some(fault) = xml.get_child("Body").and_then(extract_fault) {
                return Err(fault);
            }
            return Err(SoapError::Network(format!(
                "action request failed: HTTP {status}"
            )));
        }

        extract_response(&xml, action)
    }

    /// Establish a new GENA subscription.
    ///
    /// Sends SUBSCRIBE with CALLBACK/NT/TIMEOUT headers and returns the SID
    /// and granted lease duration from the response headers. A missing
    /// TIMEOUT header falls back to the requested duration.
    pub async fn subscribe(
        &self,
        event_url: &Url,
        callback_url: &str,
        timeout_seconds: u32,
    ) -> Result<SubscriptionResponse, SoapError> {
        debug!(%event_url, callback_url, "sending SUBSCRIBE");
        let response = self
            .http
            .request(subscribe_method(), event_url.clone())
            .header("CALLBACK", format!("<{callback_url}>"))
            .header("NT", "upnp:event")
            .header("TIMEOUT", format!("Second-{timeout_seconds}"))
            .send()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SoapError::Network(format!(
                "SUBSCRIBE failed: HTTP {}",
                response.status()
            )));
        }

        let sid = header_value(&response, "SID").ok_or_else(|| {
            SoapError::Parse("Missing SID header in SUBSCRIBE response".to_string())
        })?;
        let timeout_seconds =
            parse_timeout(header_value(&response, "TIMEOUT")).unwrap_or(timeout_seconds);

        Ok(SubscriptionResponse {
            sid,
            timeout_seconds,
        })
    }

    /// Renew an existing GENA subscription.
    ///
    /// Sends SUBSCRIBE with the SID header (no CALLBACK/NT). Devices normally
    /// keep the SID but are allowed to reissue it; the returned response
    /// carries whichever SID is now in force.
    pub async fn renew(
        &self,
        event_url: &Url,
        sid: &str,
        timeout_seconds: u32,
    ) -> Result<SubscriptionResponse, SoapError> {
        debug!(%event_url, sid, "sending SUBSCRIBE renewal");
        let response = self
            .http
            .request(subscribe_method(), event_url.clone())
            .header("SID", sid)
            .header("TIMEOUT", format!("Second-{timeout_seconds}"))
            .send()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SoapError::Network(format!(
                "SUBSCRIBE renewal failed: HTTP {}",
                response.status()
            )));
        }

        let sid = header_value(&response, "SID").unwrap_or_else(|| sid.to_string());
        let timeout_seconds =
            parse_timeout(header_value(&response, "TIMEOUT")).unwrap_or(timeout_seconds);

        Ok(SubscriptionResponse {
            sid,
            timeout_seconds,
        })
    }

    /// Cancel a GENA subscription.
    pub async fn unsubscribe(&self, event_url: &Url, sid: &str) -> Result<(), SoapError> {
        debug!(%event_url, sid, "sending UNSUBSCRIBE");
        let response = self
            .http
            .request(unsubscribe_method(), event_url.clone())
            .header("SID", sid)
            .send()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SoapError::Network(format!(
                "UNSUBSCRIBE failed: HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Parse a GENA TIMEOUT header ("Second-1800") into seconds.
fn parse_timeout(header: Option<String>) -> Option<u32> {
    let header = header?;
    header.strip_prefix("Second-")?.parse::<u32>().ok()
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn extract_response(xml: &Element, action: &str) -> Result<Element, SoapError> {
    let body = xml
        .get_child("Body")
        .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

    if let Some(fault) = extract_fault(body) {
        return Err(fault);
    }

    let response_name = format!("{}Response", action);
    body.get_child(response_name.as_str())
        .cloned()
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
}

fn extract_fault(body: &Element) -> Option<SoapError> {
    let fault = body.get_child("Fault")?;
    let upnp_error = fault.get_child("detail").and_then(|detail| {
        detail
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .find(|e| e.name.eq_ignore_ascii_case("UPnPError"))
    });

    let code = upnp_error
        .and_then(|e| e.get_child("errorCode"))
        .and_then(|c| c.get_text())
        .and_then(|t| t.trim().parse::<u16>().ok())
        .unwrap_or(500);

    let description = upnp_error
        .and_then(|e| e.get_child("errorDescription"))
        .and_then(|c| c.get_text())
        .map(|t| t.trim().to_string())
        .or_else(|| {
            fault
                .get_child("faultstring")
                .and_then(|c| c.get_text())
                .map(|t| t.trim().to_string())
        })
        .unwrap_or_default();

    Some(SoapError::Fault { code, description })
}
