//! Error types for the UPnP client.

use soap_client::SoapError;

/// Errors surfaced by [`DeviceClient`](crate::DeviceClient) operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection, timeout, or otherwise unusable transport-level response
    #[error("transport error: {0}")]
    Transport(String),

    /// A description document is missing required fields or unparsable
    #[error("malformed description: {0}")]
    MalformedDescription(String),

    /// The serviceId is not declared by the device
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// The action is not declared by the service
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The device answered an action with a SOAP fault
    #[error("action fault {code}: {description}")]
    ActionFault {
        /// UPnP error code from the fault detail
        code: u16,
        /// Device-provided error description
        description: String,
    },

    /// A SUBSCRIBE request or the eventing server failed
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience type alias for Results using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<SoapError> for ClientError {
    fn from(err: SoapError) -> Self {
        match err {
            SoapError::Fault { code, description } => ClientError::ActionFault { code, description },
            SoapError::Parse(msg) => ClientError::Transport(format!("unparsable response: {msg}")),
            SoapError::Network(msg) => ClientError::Transport(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ClientError::UnknownService("urn:test-1".to_string());
        assert_eq!(error.to_string(), "unknown service: urn:test-1");

        let error = ClientError::ActionFault {
            code: 401,
            description: "Invalid Action".to_string(),
        };
        assert_eq!(error.to_string(), "action fault 401: Invalid Action");
    }

    #[test]
    fn test_conversion_from_soap_error() {
        let fault = SoapError::Fault {
            code: 718,
            description: "ConflictInMappingEntry".to_string(),
        };
        match ClientError::from(fault) {
            ClientError::ActionFault { code, .. } => assert_eq!(code, 718),
            other => panic!("expected ActionFault, got {other:?}"),
        }

        let network = SoapError::Network("connection refused".to_string());
        match ClientError::from(network) {
            ClientError::Transport(msg) => assert_eq!(msg, "connection refused"),
            other => panic!("expected Transport, got {other:?}"),
        }
    }
}
