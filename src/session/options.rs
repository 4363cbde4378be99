//! Session configuration.
//!
//! Endpoint, keep-alive and reconnect settings supplied by the host.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use playground_client::{ReconnectPolicy, SessionOptions};
//!
//! let options = SessionOptions::new()
//!     .with_endpoint("ws://127.0.0.1:6060")
//!     .with_heartbeat_period(Duration::from_secs(15))
//!     .with_reconnect(ReconnectPolicy::default());
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::heartbeat::DEFAULT_HEARTBEAT_PERIOD;

use super::reconnect::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Default execution service endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:6060";

/// Default timeout for opening the socket.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SessionOptions
// ============================================================================

/// Host configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// WebSocket URL of the execution service.
    pub endpoint: String,

    /// Keep-alive period in milliseconds; `0` disables the heartbeat.
    pub heartbeat_period_ms: u64,

    /// Socket open timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Reconnect policy; `None` leaves a lost session failed.
    pub reconnect: Option<ReconnectPolicy>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            heartbeat_period_ms: DEFAULT_HEARTBEAT_PERIOD.as_millis() as u64,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            reconnect: None,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionOptions {
    /// Sets the endpoint URL.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the keep-alive period. Zero disables the heartbeat.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period_ms = period.as_millis() as u64;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Enables reconnecting with the given policy.
    #[inline]
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = Some(policy);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl SessionOptions {
    /// Returns the heartbeat period, or `None` if disabled.
    #[must_use]
    pub fn heartbeat_period(&self) -> Option<Duration> {
        (self.heartbeat_period_ms > 0).then(|| Duration::from_millis(self.heartbeat_period_ms))
    }

    /// Returns the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validates the options and returns the parsed endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the endpoint does not parse
    /// - [`Error::Config`] if the scheme is not `ws`/`wss` or the connect
    ///   timeout is zero
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint)?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "endpoint scheme must be ws or wss, got '{}'",
                url.scheme()
            )));
        }

        if self.connect_timeout_ms == 0 {
            return Err(Error::config("connect timeout must be greater than zero"));
        }

        if let Some(policy) = &self.reconnect
            && policy.max_delay_ms < policy.base_delay_ms
        {
            return Err(Error::config(
                "reconnect max delay must not be below the base delay",
            ));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================
