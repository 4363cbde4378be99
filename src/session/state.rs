//! Session state types.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// ConnectionState
// ============================================================================

/// State of the socket connection as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Socket is being established.
    Connecting,
    /// Socket is open.
    Open,
    /// Session was disposed locally.
    Closed,
    /// Socket errored or was closed by the remote end.
    Failed,
}

impl ConnectionState {
    /// Returns `true` if the socket is open.
    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Failed => "failed",
        })
    }
}

// ============================================================================
// RunState
// ============================================================================

/// Progress of the single run a session may have in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run submitted on this connection yet.
    Idle,
    /// Source sent, waiting for the `running` sentinel.
    Starting,
    /// Service confirmed execution started.
    Running,
    /// Service signalled completion; a new run may be submitted.
    ReadyToRun,
}

impl RunState {
    /// Returns `true` if a run is in flight.
    #[inline]
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::ReadyToRun => "ready_to_run",
        })
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Snapshot of connection and run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionState {
    /// Socket state.
    pub connection: ConnectionState,
    /// Run state.
    pub run: RunState,
}

impl SessionState {
    /// State of a freshly created session.
    pub const INITIAL: Self = Self {
        connection: ConnectionState::Connecting,
        run: RunState::Idle,
    };

    /// Returns `true` if a new run request would be accepted.
    #[inline]
    #[must_use]
    pub const fn accepts_run(&self) -> bool {
        self.connection.is_open() && !self.run.is_busy()
    }

    /// Returns `true` if an in-flight run implies an open connection.
    #[inline]
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !self.run.is_busy() || self.connection.is_open()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection, self.run)
    }
}

// ============================================================================
// Tests
// ============================================================================
