//! Session owner and event pump.
//!
//! A [`Session`] ties one transport connection, its heartbeat and the run
//! state machine together. Transport events are consumed by a single pump
//! task, strictly in arrival order; host calls and the pump serialize on
//! the machine lock.
//!
//! Host events are queued while the machine lock is held and handed to the
//! handler by a separate dispatch task, so a handler may call back into the
//! session.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::command::CommandSurface;
use crate::error::{Error, Result};
use crate::heartbeat::Heartbeat;
use crate::identifiers::SessionId;
use crate::transport::{Connection, TransportEvent, TransportEvents};

use super::builder::SessionBuilder;
use super::event::{EventHandler, SessionEvent};
use super::machine::RunSessionStateMachine;
use super::options::SessionOptions;
use super::state::SessionState;

// ============================================================================
// Session
// ============================================================================

/// Client side of one playground session.
///
/// Created with [`Session::builder`]. Dropping the session closes it.
///
/// # Example
///
/// ```no_run
/// use playground_client::{Result, Session, SessionEvent};
///
/// # async fn example() -> Result<()> {
/// let session = Session::builder()
///     .endpoint("ws://127.0.0.1:6060")
///     .on_event(|event| {
///         if let SessionEvent::OutputAppended(text) = event {
///             print!("{text}");
///         }
///     })
///     .connect()
///     .await?;
///
/// session.run("print(1)")?;
/// # Ok(())
/// # }
/// ```
pub struct Session {
    inner: Arc<SessionInner>,
    pump: JoinHandle<()>,
}

/// State shared between the session handle and its pump task.
pub(crate) struct SessionInner {
    id: SessionId,
    url: Url,
    options: SessionOptions,
    machine: Mutex<RunSessionStateMachine>,
    /// Queue to the dispatch task. Taken on close so the task can finish.
    events_tx: Mutex<Option<mpsc::UnboundedSender<SessionEvent>>>,
    connection: Mutex<Option<Connection>>,
    heartbeat: Mutex<Option<Heartbeat>>,
    closed: AtomicBool,
}

// ============================================================================
// Session - Constructor
// ============================================================================

impl Session {
    /// Creates a session builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Connects to the endpoint and starts the pump.
    ///
    /// The first connection attempt must succeed; the reconnect policy only
    /// applies to connections lost later.
    pub(crate) async fn connect(
        options: SessionOptions,
        handler: Option<EventHandler>,
    ) -> Result<Self> {
        let url = options.validate()?;
        let id = SessionId::generate();
        let span = info_span!("session", session_id = %id);

        let events_tx = handler.map(|handler| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(dispatch_events(handler, rx).instrument(span.clone()));
            tx
        });
        let inner = Arc::new(SessionInner::new(id, url, options, events_tx));

        let events = inner.open_connection().instrument(span.clone()).await?;

        let pump = tokio::spawn(Arc::clone(&inner).run_pump(events).instrument(span));

        Ok(Self { inner, pump })
    }
}

// ============================================================================
// Session - Public API
// ============================================================================

impl Session {
    /// Submits `source` for execution.
    ///
    /// # Errors
    ///
    /// - [`Error::RunRejected`] if `source` is empty, a run is in flight or
    ///   the connection is not open
    /// - [`Error::NotConnected`] if the socket went away while sending; the
    ///   error text is also appended to the output
    pub fn run(&self, source: &str) -> Result<()> {
        let connection = self.inner.connection.lock().clone();

        self.inner.apply(|machine| {
            machine.request_run(source, |text| match &connection {
                Some(connection) => connection.send(text),
                None => Err(Error::NotConnected),
            })
        })
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Returns the current state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.machine.lock().state()
    }

    /// Returns the projected run command.
    #[must_use]
    pub fn command(&self) -> CommandSurface {
        self.inner.machine.lock().command()
    }

    /// Returns all buffered output, escaped and concatenated.
    #[must_use]
    pub fn output_text(&self) -> String {
        self.inner.machine.lock().output().text()
    }

    /// Returns a copy of the buffered output chunks.
    #[must_use]
    pub fn output_chunks(&self) -> Vec<String> {
        self.inner.machine.lock().output().chunks().to_vec()
    }

    /// Returns `true` while the keep-alive timer is active.
    #[must_use]
    pub fn heartbeat_running(&self) -> bool {
        self.inner
            .heartbeat
            .lock()
            .as_ref()
            .is_some_and(Heartbeat::is_running)
    }

    /// Closes the session. Idempotent.
    ///
    /// Stops the heartbeat, closes the socket and moves the session to
    /// `Closed`. A run in flight is abandoned.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.pump.abort();
        self.inner.stop_heartbeat();

        if let Some(connection) = self.inner.connection.lock().take() {
            connection.shutdown();
        }

        self.inner.apply(RunSessionStateMachine::on_disposed);
        self.inner.events_tx.lock().take();
        info!(session_id = %self.inner.id, "Session closed");
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// SessionInner - Event Pump
// ============================================================================

impl SessionInner {
    /// Consumes transport events until the session is closed or the
    /// connection is lost for good.
    async fn run_pump(self: Arc<Self>, mut events: TransportEvents) {
        let mut reconnected = false;

        loop {
            let reason = match events.recv().await {
                Some(TransportEvent::Open) => {
                    if self.closed.load(Ordering::Acquire) {
                        break;
                    }
                    if reconnected {
                        self.apply(RunSessionStateMachine::on_reconnected);
                    } else {
                        self.apply(RunSessionStateMachine::on_transport_open);
                    }
                    self.start_heartbeat();
                    continue;
                }

                Some(TransportEvent::Message(text)) => {
                    self.apply(|machine| machine.on_inbound(&text));
                    continue;
                }

                Some(TransportEvent::Closed) => "closed by remote".to_string(),
                Some(TransportEvent::Failed(reason)) => reason,
                None => "transport stopped".to_string(),
            };

            self.stop_heartbeat();
            self.connection.lock().take();
            self.apply(|machine| machine.on_transport_lost(&reason));
            warn!(%reason, "Connection lost");

            match self.reconnect().await {
                Some(next) => {
                    events = next;
                    reconnected = true;
                }
                None => break,
            }
        }

        debug!("Session pump terminated");
    }

    /// Retries the connection per the reconnect policy.
    async fn reconnect(&self) -> Option<TransportEvents> {
        let policy = self.options.reconnect?;
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            if !policy.allows(attempt) {
                warn!(attempts = attempt - 1, "Reconnect attempts exhausted");
                return None;
            }

            let delay = policy.delay(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            tokio::time::sleep(delay).await;

            if self.closed.load(Ordering::Acquire) {
                return None;
            }

            match self.open_connection().await {
                Ok(events) => return Some(events),
                Err(Error::ConnectionClosed) => return None,
                Err(e) => warn!(attempt, error = %e, "Reconnect attempt failed"),
            }
        }
    }

    /// Opens a socket and installs it as the current connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session was closed while the
    /// socket was opening; the new socket is shut down again.
    async fn open_connection(&self) -> Result<TransportEvents> {
        let (connection, events) =
            Connection::connect(&self.url, self.options.connect_timeout()).await?;

        let mut slot = self.connection.lock();
        if self.closed.load(Ordering::Acquire) {
            connection.shutdown();
            return Err(Error::ConnectionClosed);
        }
        *slot = Some(connection);
        Ok(events)
    }
}

// ============================================================================
// SessionInner - Helpers
// ============================================================================

impl SessionInner {
    fn new(
        id: SessionId,
        url: Url,
        options: SessionOptions,
        events_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
    ) -> Self {
        Self {
            id,
            url,
            options,
            machine: Mutex::new(RunSessionStateMachine::new()),
            events_tx: Mutex::new(events_tx),
            connection: Mutex::new(None),
            heartbeat: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Runs one machine transition and queues its events for the host.
    fn apply<T>(&self, f: impl FnOnce(&mut RunSessionStateMachine) -> T) -> T {
        let mut machine = self.machine.lock();
        let out = f(&mut machine);
        let events = machine.take_events();

        // Queued before the machine lock is released, so batches keep
        // transition order.
        if let Some(tx) = self.events_tx.lock().as_ref() {
            for event in events {
                let _ = tx.send(event);
            }
        }

        out
    }

    fn start_heartbeat(&self) {
        let Some(period) = self.options.heartbeat_period() else {
            return;
        };
        let Some(connection) = self.connection.lock().clone() else {
            return;
        };

        // Checked under the heartbeat lock; close() sets the flag before it
        // stops the heartbeat.
        let mut slot = self.heartbeat.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        match Heartbeat::start(Arc::new(connection), period) {
            Ok(heartbeat) => *slot = Some(heartbeat),
            Err(e) => warn!(error = %e, "Heartbeat not started"),
        }
    }

    fn stop_heartbeat(&self) {
        if let Some(mut heartbeat) = self.heartbeat.lock().take() {
            heartbeat.stop();
        }
    }
}

// ============================================================================
// Event Dispatch
// ============================================================================

/// Hands queued events to the host handler until the queue is closed.
async fn dispatch_events(
    handler: EventHandler,
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
) {
    while let Some(event) = rx.recv().await {
        handler(event);
    }
    debug!("Event dispatch stopped");
}

// ============================================================================
// Tests
// ============================================================================
