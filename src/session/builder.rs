//! Builder pattern for session configuration.
//!
//! Provides a fluent API for configuring and connecting a [`Session`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use playground_client::{ReconnectPolicy, Session};
//!
//! # async fn example() -> playground_client::Result<()> {
//! let session = Session::builder()
//!     .endpoint("ws://127.0.0.1:6060")
//!     .heartbeat_period(Duration::from_secs(20))
//!     .reconnect(ReconnectPolicy::default())
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use crate::error::Result;

use super::core::Session;
use super::event::{EventHandler, SessionEvent};
use super::options::SessionOptions;
use super::reconnect::ReconnectPolicy;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`Session`].
///
/// Use [`Session::builder()`] to create a new builder.
#[derive(Default)]
pub struct SessionBuilder {
    /// Options being assembled.
    options: SessionOptions,
    /// Host event callback.
    handler: Option<EventHandler>,
}

// ============================================================================
// SessionBuilder Implementation
// ============================================================================

impl SessionBuilder {
    /// Creates a new builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options, e.g. with ones loaded from a config file.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the execution service URL.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - WebSocket URL (e.g., "ws://127.0.0.1:6060")
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.options.endpoint = endpoint.into();
        self
    }

    /// Sets the keep-alive period. Zero disables the heartbeat.
    #[inline]
    #[must_use]
    pub fn heartbeat_period(mut self, period: Duration) -> Self {
        self.options = self.options.with_heartbeat_period(period);
        self
    }

    /// Sets the socket open timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_connect_timeout(timeout);
        self
    }

    /// Enables reconnecting after a lost connection.
    #[inline]
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.options = self.options.with_reconnect(policy);
        self
    }

    /// Sets the host event callback.
    #[inline]
    #[must_use]
    pub fn on_event<F>(mut self, handler: F) -> Self
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Returns the options assembled so far.
    #[inline]
    #[must_use]
    pub fn current_options(&self) -> &SessionOptions {
        &self.options
    }

    /// Validates the options and opens the session.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) or
    ///   [`Error::InvalidUrl`](crate::Error::InvalidUrl) for bad options
    /// - [`Error::Connection`](crate::Error::Connection) or
    ///   [`Error::ConnectionTimeout`](crate::Error::ConnectionTimeout) if the
    ///   socket cannot be opened
    pub async fn connect(self) -> Result<Session> {
        Session::connect(self.options, self.handler).await
    }
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("options", &self.options)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
