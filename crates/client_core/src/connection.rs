//! The session's single chat socket.
//!
//! A background task owns each socket. Every open bumps a generation counter;
//! tasks from an older generation can no longer change state, which keeps at
//! most one live connection per session even when a manual `connect` races a
//! pending reconnect.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::{SinkExt, StreamExt};
use shared::protocol::ClientRequest;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    context::token_unexpired,
    error::{DroppedReason, SessionError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket opened; time to fetch channels and rosters.
    Ready,
    /// One inbound text frame, undecoded.
    Frame(String),
    /// The socket went away; a reconnect is already scheduled.
    Closed { reason: Option<String> },
    Error(String),
    /// The token expired while reconnecting. No further attempts are made.
    AuthExpired,
}

/// Owns the chat socket and its reconnection timer. Clones share one socket.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct Shared {
    settings: ClientSettings,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: ConnectionState,
    generation: u64,
    /// Generation of a socket being closed by `shutdown`.
    closing: Option<u64>,
    token: Option<String>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    io_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    attempts: u64,
}

impl ConnectionManager {
    pub fn new(settings: &ClientSettings) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            shared: Arc::new(Shared {
                settings: settings.clone(),
                events,
                inner: Mutex::new(Inner {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    closing: None,
                    token: None,
                    outbound: None,
                    io_task: None,
                    reconnect_timer: None,
                    attempts: 0,
                }),
            }),
        };
        (manager, events_rx)
    }

    /// Opens a fresh connection, replacing any existing socket and cancelling
    /// a pending reconnect. Must be called from within a tokio runtime.
    pub fn connect(&self, auth_token: &str) -> Result<(), SessionError> {
        if auth_token.trim().is_empty() {
            error!("no auth token available; not connecting");
            return Err(SessionError::MissingToken);
        }
        if !token_unexpired(auth_token) {
            error!("auth token expired; not connecting");
            return Err(SessionError::TokenExpired);
        }
        let url = self.shared.settings.chat_endpoint(auth_token)?;

        let mut inner = self.shared.lock();
        if let Some(timer) = inner.reconnect_timer.take() {
            debug!("cancelling pending reconnect for manual connect");
            timer.abort();
        }
        inner.token = Some(auth_token.to_string());
        self.shared.open(&mut inner, url);
        Ok(())
    }

    /// Queues one frame. Nothing is buffered while the socket is not open.
    pub fn send(&self, request: &ClientRequest) -> Result<(), DroppedReason> {
        let inner = self.shared.lock();
        let outbound = match (inner.state, inner.outbound.as_ref()) {
            (ConnectionState::Open, Some(outbound)) => outbound,
            (state, _) => {
                warn!(
                    message_type = request.message_type(),
                    ?state,
                    "chat connection is not open; dropping outbound frame"
                );
                return Err(DroppedReason::NotConnected);
            }
        };
        let text =
            serde_json::to_string(request).map_err(|err| DroppedReason::Encode(err.to_string()))?;
        outbound.send(text).map_err(|_| {
            warn!(
                message_type = request.message_type(),
                "chat socket task is gone; dropping outbound frame"
            );
            DroppedReason::NotConnected
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Total sockets opened so far, reconnects included.
    pub fn connection_attempts(&self) -> u64 {
        self.shared.lock().attempts
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.shared.lock().reconnect_timer.is_some()
    }

    /// Closes the socket and cancels the reconnect timer. Safe to call twice.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        if let Some(timer) = inner.reconnect_timer.take() {
            timer.abort();
        }
        inner.token = None;
        let graceful = inner.state == ConnectionState::Open;
        let closing_generation = inner.generation;
        Shared::teardown_socket(&mut inner);
        inner.generation += 1;
        if graceful {
            inner.closing = Some(closing_generation);
            inner.state = ConnectionState::Closing;
        } else {
            inner.state = ConnectionState::Disconnected;
        }
        info!("chat connection shut down");
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: ConnectionEvent) {
        // A dropped receiver means the session is gone.
        let _ = self.events.send(event);
    }

    fn open(self: &Arc<Self>, inner: &mut Inner, url: Url) {
        Self::teardown_socket(inner);
        // A socket still closing from `shutdown` must not touch the new one.
        inner.closing = None;
        inner.generation += 1;
        inner.attempts += 1;
        inner.state = ConnectionState::Connecting;
        let generation = inner.generation;
        info!(generation, attempt = inner.attempts, "opening chat connection");
        inner.io_task = Some(tokio::spawn(run_connection(Arc::clone(self), generation, url)));
    }

    /// Releases the current socket. An open socket is closed gracefully by its
    /// task once the outbound sender drops; a socket still connecting is aborted.
    fn teardown_socket(inner: &mut Inner) {
        inner.outbound = None;
        if let Some(task) = inner.io_task.take() {
            if inner.state == ConnectionState::Connecting {
                task.abort();
            }
        }
    }

    fn mark_open(&self, generation: u64, outbound: mpsc::UnboundedSender<String>) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = ConnectionState::Open;
        inner.outbound = Some(outbound);
        true
    }

    fn on_closed(self: &Arc<Self>, generation: u64, reason: Option<String>) {
        let mut inner = self.lock();
        if inner.generation != generation {
            if inner.closing == Some(generation) {
                inner.closing = None;
                inner.state = ConnectionState::Disconnected;
                debug!(generation, "chat connection closed after shutdown");
            }
            return;
        }

        inner.state = ConnectionState::Disconnected;
        inner.outbound = None;
        inner.io_task = None;
        let delay = self.settings.reconnect_delay;
        warn!(generation, ?reason, ?delay, "chat connection closed; scheduling reconnect");
        self.emit(ConnectionEvent::Closed { reason });

        if let Some(timer) = inner.reconnect_timer.take() {
            timer.abort();
        }
        let shared = Arc::clone(self);
        inner.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.fire_reconnect();
        }));
    }

    fn fire_reconnect(self: &Arc<Self>) {
        let mut inner = self.lock();
        // Dropping our own handle detaches rather than aborts.
        inner.reconnect_timer = None;
        if matches!(
            inner.state,
            ConnectionState::Open | ConnectionState::Connecting
        ) {
            debug!(state = ?inner.state, "connection already live; skipping reconnect");
            return;
        }
        let Some(token) = inner.token.clone() else {
            debug!("session ended; skipping reconnect");
            return;
        };
        if !token_unexpired(&token) {
            warn!("auth token expired; giving up on reconnecting");
            inner.token = None;
            self.emit(ConnectionEvent::AuthExpired);
            return;
        }
        match self.settings.chat_endpoint(&token) {
            Ok(url) => {
                info!("attempting to reconnect");
                self.open(&mut inner, url);
            }
            Err(err) => error!("cannot rebuild chat endpoint: {err}"),
        }
    }
}

async fn run_connection(shared: Arc<Shared>, generation: u64, url: Url) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(err) => {
            warn!(generation, "failed to open chat connection: {err}");
            shared.emit(ConnectionEvent::Error(err.to_string()));
            shared.on_closed(generation, Some(err.to_string()));
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let (mut ws_writer, mut ws_reader) = ws_stream.split();
    if !shared.mark_open(generation, outbound_tx) {
        debug!(generation, "connection superseded while opening; closing it");
        let _ = ws_writer.send(Message::Close(None)).await;
        return;
    }
    info!(generation, "chat connection established");
    shared.emit(ConnectionEvent::Ready);

    let reason = loop {
        tokio::select! {
            frame = ws_reader.next() => match frame {
                Some(Ok(Message::Text(text))) => shared.emit(ConnectionEvent::Frame(text)),
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|frame| frame.reason.to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    error!(generation, "chat socket receive failed: {err}");
                    shared.emit(ConnectionEvent::Error(err.to_string()));
                    break Some(err.to_string());
                }
                None => break None,
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(text) => {
                    if let Err(err) = ws_writer.send(Message::Text(text)).await {
                        error!(generation, "chat socket send failed: {err}");
                        shared.emit(ConnectionEvent::Error(err.to_string()));
                        break Some(err.to_string());
                    }
                }
                None => {
                    debug!(generation, "closing chat connection");
                    let _ = ws_writer.send(Message::Close(None)).await;
                    break None;
                }
            },
        }
    };

    shared.on_closed(generation, reason);
}

#[cfg(test)]
#[path = "tests/connection_tests.rs"]
mod tests;
