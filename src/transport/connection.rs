//! WebSocket connection and event loop.
//!
//! This module owns the socket to the execution service. Outbound frames
//! go through a command channel; inbound frames and state changes come out
//! of a single-consumer event channel, in arrival order.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming text frames from the service
//! - Outgoing frames from the session and heartbeat
//! - Remote close and socket errors

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::Link;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsWrite = SplitSink<WsStream, Message>;

/// Receiving half of a connection's event channel.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

// ============================================================================
// TransportEvent
// ============================================================================

/// Event emitted by a connection, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Socket is open. Always the first event.
    Open,
    /// Text frame received.
    Message(String),
    /// Remote end closed the socket.
    Closed,
    /// Socket error.
    Failed(String),
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a text frame.
    Send(String),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the execution service.
///
/// Cloning is cheap; all clones share the same socket.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Open flag (shared with event loop).
    open: Arc<AtomicBool>,
}

impl Connection {
    /// Opens a connection to `url`.
    ///
    /// Returns the connection and its event channel. The first event is
    /// always [`TransportEvent::Open`].
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake does not finish in time
    /// - [`Error::Connection`] if the socket cannot be established
    pub async fn connect(
        url: &Url,
        connect_timeout: Duration,
    ) -> Result<(Self, TransportEvents)> {
        let handshake = tokio_tungstenite::connect_async(url.as_str());

        let (ws_stream, _) = timeout(connect_timeout, handshake)
            .await
            .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))?
            .map_err(|e| Error::connection(format!("{url}: {e}")))?;

        info!(%url, "WebSocket connection established");

        Ok(Self::from_stream(ws_stream))
    }

    /// Wraps an established stream and spawns the event loop.
    fn from_stream(ws_stream: WsStream) -> (Self, TransportEvents) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        let _ = event_tx.send(TransportEvent::Open);

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            event_tx,
            Arc::clone(&open),
        ));

        (Self { command_tx, open }, event_rx)
    }

    /// Returns `true` while the socket is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queues a text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the socket is not open.
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }

        self.command_tx
            .send(ConnectionCommand::Send(text.into()))
            .map_err(|_| Error::NotConnected)
    }

    /// Closes the socket gracefully.
    ///
    /// No event is emitted for a local shutdown.
    pub fn shutdown(&self) {
        self.open.store(false, Ordering::Release);
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
        open: Arc<AtomicBool>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let terminal = loop {
            tokio::select! {
                // Incoming frames from the service
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Frame received");
                            let body = text.as_str().to_owned();
                            let _ = event_tx.send(TransportEvent::Message(body));
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break Some(TransportEvent::Closed);
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break Some(TransportEvent::Failed(e.to_string()));
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break Some(TransportEvent::Closed);
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the session
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(text)) => {
                            if let Err(e) = Self::handle_send(text, &mut ws_write).await {
                                break Some(TransportEvent::Failed(e.to_string()));
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break None;
                        }

                        None => {
                            debug!("Command channel closed");
                            let _ = ws_write.close().await;
                            break None;
                        }
                    }
                }
            }
        };

        open.store(false, Ordering::Release);

        if let Some(event) = terminal {
            let _ = event_tx.send(event);
        }

        debug!("Event loop terminated");
    }

    /// Writes one text frame.
    async fn handle_send(text: String, ws_write: &mut WsWrite) -> Result<()> {
        let len = text.len();

        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
            warn!(error = %e, "Failed to send frame");
            return Err(e.into());
        }

        trace!(len, "Frame sent");
        Ok(())
    }
}

impl Link for Connection {
    #[inline]
    fn is_open(&self) -> bool {
        Connection::is_open(self)
    }

    #[inline]
    fn send_text(&self, text: String) -> Result<()> {
        self.send(text)
    }
}

// ============================================================================
// Tests
// ============================================================================
