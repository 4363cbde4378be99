//! Run command projection.
//!
//! The host's run button is never toggled directly. Its enabled flag and
//! label are recomputed from [`SessionState`] after every transition.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

use crate::session::{RunState, SessionState};

// ============================================================================
// CommandLabel
// ============================================================================

/// Label shown on the run command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandLabel {
    /// Idle affordance.
    Run,
    /// Shown once the service confirmed execution started.
    Running,
}

impl CommandLabel {
    /// Returns the display text.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "Run",
            Self::Running => "Running",
        }
    }
}

impl fmt::Display for CommandLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CommandSurface
// ============================================================================

/// Enabled flag and label of the run command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandSurface {
    /// Whether invoking run would be accepted.
    pub enabled: bool,
    /// Current label.
    pub label: CommandLabel,
}

impl CommandSurface {
    /// Projects the command state from a session snapshot.
    #[must_use]
    pub const fn project(state: SessionState) -> Self {
        let label = match state.run {
            RunState::Running => CommandLabel::Running,
            _ => CommandLabel::Run,
        };

        Self {
            enabled: state.accepts_run(),
            label,
        }
    }
}

impl From<SessionState> for CommandSurface {
    #[inline]
    fn from(state: SessionState) -> Self {
        Self::project(state)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::session::ConnectionState;

    fn state(connection: ConnectionState, run: RunState) -> SessionState {
        SessionState { connection, run }
    }

    #[test]
    fn test_enabled_only_when_open_and_idle_or_ready() {
        for run in [RunState::Idle, RunState::ReadyToRun] {
            assert!(CommandSurface::project(state(ConnectionState::Open, run)).enabled);
        }
        for run in [RunState::Starting, RunState::Running] {
            assert!(!CommandSurface::project(state(ConnectionState::Open, run)).enabled);
        }
        for connection in [
            ConnectionState::Connecting,
            ConnectionState::Closed,
            ConnectionState::Failed,
        ] {
            assert!(!CommandSurface::project(state(connection, RunState::Idle)).enabled);
        }
    }

    #[test]
    fn test_label_running_only_after_confirmation() {
        let starting = CommandSurface::project(state(ConnectionState::Open, RunState::Starting));
        assert_eq!(starting.label, CommandLabel::Run);

        let running = CommandSurface::project(state(ConnectionState::Open, RunState::Running));
        assert_eq!(running.label, CommandLabel::Running);
        assert_eq!(running.label.to_string(), "Running");
    }
}
