//! Inbound and outbound protocol messages.
//!
//! Every inbound text frame is classified by exact, case-sensitive string
//! match. There is no partial parsing: a frame is either one of the two
//! sentinels or opaque output content.
//!
//! # Known Limitation
//!
//! Output that is literally `running` or `ready` is indistinguishable from a
//! sentinel and is treated as one. The wire format has no escaping for this.

// ============================================================================
// Constants
// ============================================================================

/// Sentinel sent by the service when execution has started.
pub const RUNNING_SENTINEL: &str = "running";

/// Sentinel sent by the service when execution finished and a new run may
/// be submitted.
pub const READY_SENTINEL: &str = "ready";

// ============================================================================
// Inbound
// ============================================================================

/// A message received from the execution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Execution started; prior output should be cleared.
    Running,
    /// Execution finished; the client may submit again.
    Ready,
    /// Raw output text, possibly containing line breaks.
    Content(&'a str),
}

impl<'a> Inbound<'a> {
    /// Classifies an inbound frame body.
    #[must_use]
    pub fn parse(text: &'a str) -> Self {
        match text {
            RUNNING_SENTINEL => Self::Running,
            READY_SENTINEL => Self::Ready,
            content => Self::Content(content),
        }
    }

    /// Returns `true` for the control sentinels.
    #[inline]
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::Running | Self::Ready)
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// A message sent to the execution service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Execute the given source text.
    Run(String),
    /// Empty frame that only keeps the connection alive.
    KeepAlive,
}

impl Outbound {
    /// Creates a run message.
    #[inline]
    pub fn run(source: impl Into<String>) -> Self {
        Self::Run(source.into())
    }

    /// Returns `true` if this is a keep-alive.
    #[inline]
    #[must_use]
    pub const fn is_keep_alive(&self) -> bool {
        matches!(self, Self::KeepAlive)
    }

    /// Converts into the frame body put on the wire.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Run(source) => source,
            Self::KeepAlive => String::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
