//! Host-facing session events.
//!
//! These are the only points where the session talks to the presentation
//! layer. Events are delivered in transition order by a dispatch task that
//! holds no session lock, so handlers may call back into the session.

// ============================================================================
// Imports
// ============================================================================

use super::state::SessionState;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called for each event, in order, after the transition that produced it
/// has completed. The handler runs on a tokio worker and may call
/// [`Session::run`](crate::Session::run) or
/// [`Session::close`](crate::Session::close). The session state it reads may
/// already be ahead of the event.
pub type EventHandler = Box<dyn Fn(SessionEvent) + Send + Sync>;

// ============================================================================
// SessionEvent
// ============================================================================

/// Notification from the session to the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A run was accepted and its source is being sent.
    RunRequested(String),
    /// Connection or run state changed.
    StateChanged(SessionState),
    /// An escaped chunk was appended to the output.
    OutputAppended(String),
    /// The output buffer was emptied.
    OutputCleared,
    /// The run command became enabled or disabled.
    CommandEnabled(bool),
    /// A run request was refused; nothing was sent.
    RunRejected(String),
}
