//! Run session: state machine, configuration and the owning [`Session`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent session configuration |
//! | `core` | [`Session`] owner and event pump |
//! | `event` | Host-facing [`SessionEvent`] |
//! | `machine` | [`RunSessionStateMachine`] |
//! | `options` | [`SessionOptions`] |
//! | `reconnect` | [`ReconnectPolicy`] backoff |
//! | `state` | Connection and run state types |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for session configuration.
pub mod builder;

/// Session owner and event pump.
pub mod core;

/// Host-facing session events.
pub mod event;

/// Run-session state machine.
pub mod machine;

/// Session configuration.
pub mod options;

/// Reconnect backoff policy.
pub mod reconnect;

/// Connection and run state types.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SessionBuilder;
pub use core::Session;
pub use event::{EventHandler, SessionEvent};
pub use machine::RunSessionStateMachine;
pub use options::{DEFAULT_ENDPOINT, SessionOptions};
pub use reconnect::ReconnectPolicy;
pub use state::{ConnectionState, RunState, SessionState};
