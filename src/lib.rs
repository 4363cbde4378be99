//! Playground client - run source code on a remote execution service.
//!
//! This library is the client half of an interactive code playground. The
//! host (an editor UI, a CLI, a notebook) hands source text to a [`Session`];
//! the session sends it over one long-lived WebSocket and streams status and
//! output back through [`SessionEvent`]s.
//!
//! # Architecture
//!
//! ```text
//! Session::run ─► RunSessionStateMachine ─► Connection ─► service
//!                        ▲                      │
//!                        └── TransportEvent ◄───┘
//!                        │
//!                        └─► OutputSink, CommandSurface, SessionEvent
//! ```
//!
//! Key design principles:
//!
//! - The state machine is the single source of truth; the run command's
//!   enabled flag and label are projections of it
//! - At most one run is in flight per connection
//! - Output is cleared only once the service confirms a run started
//! - A [`Heartbeat`] keeps idle connections open
//!
//! # Quick Start
//!
//! ```no_run
//! use playground_client::{Result, Session, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = Session::builder()
//!         .endpoint("ws://127.0.0.1:6060")
//!         .on_event(|event| match event {
//!             SessionEvent::OutputAppended(text) => print!("{text}"),
//!             SessionEvent::CommandEnabled(enabled) => println!("[run enabled: {enabled}]"),
//!             _ => {}
//!         })
//!         .connect()
//!         .await?;
//!
//!     session.run("print(1)")?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`command`] | Run command projection |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`heartbeat`] | Keep-alive timer |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`output`] | Escaped output buffer |
//! | [`protocol`] | Wire protocol messages |
//! | [`session`] | State machine, options and [`Session`] |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Run command projection.
pub mod command;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Keep-alive timer.
pub mod heartbeat;

/// Type-safe identifiers.
pub mod identifiers;

/// Escaped output buffer.
pub mod output;

/// Wire protocol messages.
pub mod protocol;

/// Run session: state machine, options and owner.
///
/// Use [`Session::builder()`] to configure and connect a session.
pub mod session;

/// WebSocket transport layer.
///
/// Internal module handling the socket and its event loop.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Command types
pub use command::{CommandLabel, CommandSurface};

// Error types
pub use error::{Error, Result};

// Heartbeat
pub use heartbeat::{DEFAULT_HEARTBEAT_PERIOD, Heartbeat};

// Identifier types
pub use identifiers::SessionId;

// Output types
pub use output::{OutputSink, escape_markup};

// Protocol types
pub use protocol::{Inbound, Outbound};

// Session types
pub use session::{
    ConnectionState, EventHandler, ReconnectPolicy, RunSessionStateMachine, RunState, Session,
    SessionBuilder, SessionEvent, SessionOptions, SessionState,
};

// Transport types
pub use transport::{Connection, Link, TransportEvent};
