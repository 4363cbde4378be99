//! WebSocket transport layer.
//!
//! This module handles the single socket between the playground client and
//! the remote execution service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Session (Rust) │                              │  Execution      │
//! │                 │         WebSocket            │  Service        │
//! │  Connection     │─────────────────────────────►│                 │
//! │  → events       │◄─────────────────────────────│  (opaque peer)  │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - Open the socket, first event is `Open`
//! 2. `Connection::send` - Queue source text or keep-alive frames
//! 3. `TransportEvent` - Inbound frames, then `Closed` or `Failed`
//! 4. `Connection::shutdown` - Close the socket locally
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, TransportEvent, TransportEvents};

// ============================================================================
// Link
// ============================================================================

/// Outbound half of a transport, as seen by the heartbeat.
pub trait Link: Send + Sync {
    /// Returns `true` while frames can be sent.
    fn is_open(&self) -> bool;

    /// Sends one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) if the
    /// link is not open.
    fn send_text(&self, text: String) -> Result<()>;
}
