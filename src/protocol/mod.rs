//! Playground wire protocol.
//!
//! Text-framed, one message per protocol event.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Body |
//! |---------|-----------|------|
//! | Run | Local → Remote | Full source text |
//! | Keep-alive | Local → Remote | Empty |
//! | `running` | Remote → Local | Exact sentinel |
//! | `ready` | Remote → Local | Exact sentinel |
//! | Content | Remote → Local | Any other body (raw output) |
//!
//! There is no handshake, no run identity, and no authentication.

// ============================================================================
// Submodules
// ============================================================================

/// Inbound and outbound message types.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{Inbound, Outbound, READY_SENTINEL, RUNNING_SENTINEL};
