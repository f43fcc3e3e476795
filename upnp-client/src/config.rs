//! Configuration for the UPnP device client.

use std::time::Duration;

use crate::error::ClientError;

/// Configuration for a [`DeviceClient`](crate::DeviceClient).
///
/// Controls the callback listener port, the requested subscription lease, and
/// the renewal schedule derived from what the device actually grants.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Port for the eventing callback server; 0 binds an ephemeral port
    /// Default: 0
    pub callback_port: u16,

    /// Lease duration requested in SUBSCRIBE TIMEOUT headers (seconds)
    /// Default: 1800 (30 minutes)
    pub lease_seconds: u32,

    /// Fraction of the granted lease after which renewal fires
    /// Default: 0.8
    pub renewal_margin: f64,

    /// Lower bound on the renewal delay, so very short grants cannot cause
    /// a renewal busy-loop
    /// Default: 1 second
    pub min_renewal_delay: Duration,

    /// Connect timeout for outbound HTTP requests
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Whole-request timeout for outbound HTTP requests
    /// Default: 10 seconds
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            callback_port: 0,
            lease_seconds: 1800,
            renewal_margin: 0.8,
            min_renewal_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.lease_seconds == 0 {
            return Err(ClientError::Configuration(
                "Lease duration must be greater than 0".to_string(),
            ));
        }

        if !(self.renewal_margin > 0.0 && self.renewal_margin <= 1.0) {
            return Err(ClientError::Configuration(
                "Renewal margin must be in (0, 1]".to_string(),
            ));
        }

        if self.min_renewal_delay == Duration::ZERO {
            return Err(ClientError::Configuration(
                "Minimum renewal delay must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The delay before renewing a lease the device granted for
    /// `granted_seconds`.
    pub fn renewal_delay(&self, granted_seconds: u32) -> Duration {
        let scaled = Duration::from_secs_f64(granted_seconds as f64 * self.renewal_margin);
        scaled.max(self.min_renewal_delay)
    }

    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_lease_seconds(mut self, seconds: u32) -> Self {
        self.lease_seconds = seconds;
        self
    }

    pub fn with_renewal_margin(mut self, margin: f64) -> Self {
        self.renewal_margin = margin;
        self
    }

    pub fn with_min_renewal_delay(mut self, delay: Duration) -> Self {
        self.min_renewal_delay = delay;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }
}
