use chrono::{DateTime, Utc};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::buffer::PendingAudioBuffer;
use super::config::SessionConfig;
use super::protocol::{
    ClientMessage, ServerMessage, CLOSE_ABNORMAL, CLOSE_FORCED_RECONNECT, CLOSE_NORMAL,
};
use super::state::SessionState;
use super::stats::SessionStats;
use super::transport::{Connector, OutboundFrame, TransportError, TransportEvent};
use super::SessionError;
use crate::presenter::MessagePresenter;

/// Everything that can change session state, serialized through one queue
#[derive(Debug)]
enum SessionEvent {
    ChunkSubmitted(Vec<u8>),
    StopRequested,
    ForceReconnectRequested,
    ConnectFinished {
        generation: u64,
        result: Result<mpsc::UnboundedSender<OutboundFrame>, TransportError>,
    },
    Transport {
        generation: u64,
        event: TransportEvent,
    },
    ReconnectDue {
        generation: u64,
    },
}

/// Cloneable handle the audio producer and supervisor use to drive a session.
///
/// None of these calls wait for the network; they only enqueue an event.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    /// Queue the next slice of audio, in stream order
    pub fn submit_chunk(&self, chunk: Vec<u8>) {
        if self.events.send(SessionEvent::ChunkSubmitted(chunk)).is_err() {
            debug!("Session finished, dropping audio chunk");
        }
    }

    /// Ask the server to finish the session. Idempotent.
    pub fn request_stop(&self) {
        if self.events.send(SessionEvent::StopRequested).is_err() {
            debug!("Session finished, ignoring stop request");
        }
    }

    /// Drop the current connection so the session resumes on a new one
    pub fn force_reconnect(&self) {
        if self.events.send(SessionEvent::ForceReconnectRequested).is_err() {
            debug!("Session finished, ignoring forced reconnect");
        }
    }

    /// Whether the session driver has returned
    pub fn is_finished(&self) -> bool {
        self.events.is_closed()
    }
}

/// Streams audio over a duplex connection with exactly-once delivery up to
/// the server's acknowledgment boundary.
///
/// Every submitted byte stays in the pending buffer until the server
/// acknowledges it. When a connection drops with anything but a normal
/// close, the session reconnects to the same endpoint and first replays the
/// whole pending buffer as one catch-up write, followed by the stop control
/// frame when a stop has been requested.
pub struct ResumableStreamSession {
    url: String,
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    presenter: Box<dyn MessagePresenter>,

    buffer: PendingAudioBuffer,
    state: SessionState,
    stop_requested: bool,
    stop_confirmed: bool,
    ever_opened: bool,
    reconnect_attempts: u32,

    /// Generation of the current connection attempt; events from others are stale
    generation: u64,
    current: Option<mpsc::UnboundedSender<OutboundFrame>>,

    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,

    started_at: Option<DateTime<Utc>>,
    stats: SessionStats,
}

impl ResumableStreamSession {
    pub fn new(
        url: impl Into<String>,
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        presenter: Box<dyn MessagePresenter>,
    ) -> (Self, SessionHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            events: events_tx.clone(),
        };

        let session = Self {
            url: url.into(),
            config,
            connector,
            presenter,
            buffer: PendingAudioBuffer::new(),
            state: SessionState::Connecting,
            stop_requested: false,
            stop_confirmed: false,
            ever_opened: false,
            reconnect_attempts: 0,
            generation: 0,
            current: None,
            events_tx,
            events_rx,
            started_at: None,
            stats: SessionStats::default(),
        };

        (session, handle)
    }

    /// Drive the session until it terminates.
    ///
    /// Returns the final statistics after a clean termination. Fails only
    /// when the first connection cannot be established or the reconnect
    /// policy gives up.
    pub async fn run(mut self) -> Result<SessionStats, SessionError> {
        self.started_at = Some(Utc::now());
        info!("Starting streaming session");
        self.begin_connect();

        while let Some(event) = self.events_rx.recv().await {
            match self.handle_event(event) {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => {
                    info!("Streaming session terminated cleanly");
                    return Ok(self.stats());
                }
                Err(e) => {
                    self.state = SessionState::FatalAborted;
                    error!("Streaming session aborted: {}", e);
                    return Err(e);
                }
            }
        }

        // We hold a sender ourselves, so the queue never drains
        Ok(self.stats())
    }

    fn handle_event(&mut self, event: SessionEvent) -> Result<ControlFlow<()>, SessionError> {
        match event {
            SessionEvent::ChunkSubmitted(chunk) => self.on_chunk(chunk),
            SessionEvent::StopRequested => self.on_stop_requested(),
            SessionEvent::ForceReconnectRequested => self.on_force_reconnect(),
            SessionEvent::ConnectFinished { generation, result } => {
                if generation != self.generation {
                    debug!("Ignoring stale connection attempt {}", generation);
                    return Ok(ControlFlow::Continue(()));
                }
                match result {
                    Ok(outbound) => self.on_open(outbound),
                    Err(e) => return self.on_connect_failed(e),
                }
            }
            SessionEvent::Transport { generation, event } => {
                if generation != self.generation {
                    debug!("Ignoring event from superseded connection {}", generation);
                    return Ok(ControlFlow::Continue(()));
                }
                match event {
                    TransportEvent::Message(text) => self.on_message(&text),
                    TransportEvent::Closed { code, reason } => {
                        return self.on_closed(code, &reason);
                    }
                }
            }
            SessionEvent::ReconnectDue { generation } => {
                if generation == self.generation
                    && matches!(self.state, SessionState::AbruptlyClosed { .. })
                {
                    self.begin_connect();
                }
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn on_chunk(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.buffer.append(&chunk);
        if self.state.is_open() {
            self.send(OutboundFrame::Audio(chunk));
        }
    }

    fn on_stop_requested(&mut self) {
        if self.stop_requested {
            return;
        }
        self.stop_requested = true;
        info!(
            "Stop requested ({} bytes still unacknowledged)",
            self.buffer.len()
        );
        if self.state.is_open() {
            self.send(OutboundFrame::Control(ClientMessage::StopRecording));
        }
    }

    fn on_force_reconnect(&mut self) {
        if !self.state.is_open() {
            debug!("Forced reconnect ignored in state {:?}", self.state);
            return;
        }
        info!("Forcing reconnect");
        self.stats.forced_reconnects += 1;
        self.send(OutboundFrame::Close {
            code: CLOSE_FORCED_RECONNECT,
            reason: "forced reconnect".to_string(),
        });
        self.state = SessionState::Closing;
    }

    fn on_open(&mut self, outbound: mpsc::UnboundedSender<OutboundFrame>) {
        info!("Connection {} open", self.generation);
        self.current = Some(outbound);
        self.state = SessionState::Open;
        self.ever_opened = true;
        self.reconnect_attempts = 0;
        self.stats.connections_opened += 1;

        if !self.buffer.is_empty() {
            let pending = self.buffer.pending().to_vec();
            info!("Replaying {} unacknowledged bytes", pending.len());
            self.stats.catch_up_writes += 1;
            self.stats.bytes_replayed += pending.len() as u64;
            self.send(OutboundFrame::Audio(pending));
        }
        if self.stop_requested {
            self.send(OutboundFrame::Control(ClientMessage::StopRecording));
        }
    }

    fn on_connect_failed(&mut self, error: TransportError) -> Result<ControlFlow<()>, SessionError> {
        if !self.ever_opened {
            return Err(SessionError::InitialConnect(error));
        }
        warn!("Reconnect attempt failed: {}", error);
        self.state = SessionState::AbruptlyClosed {
            code: CLOSE_ABNORMAL,
        };
        self.schedule_reconnect()?;
        Ok(ControlFlow::Continue(()))
    }

    fn on_message(&mut self, text: &str) {
        let message = match ServerMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping server message: {}", e);
                self.stats.malformed_messages += 1;
                return;
            }
        };

        self.presenter.present(&message);

        match message {
            ServerMessage::AudioAcknowledged { byte_range_end } => {
                match self.buffer.acknowledge(byte_range_end) {
                    Ok(released) => debug!(
                        "Acknowledged up to {} ({} bytes released, {} pending)",
                        byte_range_end,
                        released,
                        self.buffer.len()
                    ),
                    Err(e) => {
                        error!("Protocol violation: {}", e);
                        self.stats.protocol_violations += 1;
                    }
                }
            }
            ServerMessage::StopAcknowledged if self.stop_requested => {
                info!("Server confirmed stop");
                self.stop_confirmed = true;
            }
            ServerMessage::SessionEnded => {
                info!("Server ended the session");
                self.stop_confirmed = true;
            }
            ServerMessage::FinalTranscript(_) => self.stats.final_transcripts += 1,
            _ => {}
        }
    }

    fn on_closed(&mut self, code: u16, reason: &str) -> Result<ControlFlow<()>, SessionError> {
        info!("Connection {} closed with code {} {}", self.generation, code, reason);
        self.current = None;
        self.stats.last_close_code = Some(code);

        // A normal close only ends the session when we did not start it
        let closed_by_us = self.state == SessionState::Closing;
        if self.stop_confirmed || (code == CLOSE_NORMAL && !closed_by_us) {
            self.state = SessionState::Terminated { code };
            return Ok(ControlFlow::Break(()));
        }

        self.state = SessionState::AbruptlyClosed { code };
        self.schedule_reconnect()?;
        Ok(ControlFlow::Continue(()))
    }

    fn schedule_reconnect(&mut self) -> Result<(), SessionError> {
        self.reconnect_attempts += 1;
        let attempt = self.reconnect_attempts;
        if !self.config.reconnect.allows(attempt) {
            return Err(SessionError::ReconnectExhausted {
                attempts: attempt - 1,
            });
        }

        self.stats.reconnects += 1;
        let delay = self.config.reconnect.delay_for(attempt);
        info!("Reconnecting in {:?} (attempt {})", delay, attempt);

        let events = self.events_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::ReconnectDue { generation });
        });
        Ok(())
    }

    fn begin_connect(&mut self) {
        self.generation += 1;
        self.state = SessionState::Connecting;
        self.current = None;

        let generation = self.generation;
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let events = self.events_tx.clone();

        info!("Connecting (connection {})", generation);

        tokio::spawn(async move {
            let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
            let result = connector.connect(&url, inbound_tx).await;
            let connected = result.is_ok();

            if events
                .send(SessionEvent::ConnectFinished { generation, result })
                .is_err()
                || !connected
            {
                return;
            }

            while let Some(event) = inbound_rx.recv().await {
                if events
                    .send(SessionEvent::Transport { generation, event })
                    .is_err()
                {
                    break;
                }
            }
        });
    }

    fn send(&mut self, frame: OutboundFrame) {
        if let Some(outbound) = &self.current {
            if outbound.send(frame).is_err() {
                // The transport reports the close separately
                debug!("Connection {} no longer accepts frames", self.generation);
            }
        }
    }

    /// Snapshot of the session counters
    pub fn stats(&self) -> SessionStats {
        let duration_secs = self
            .started_at
            .map(|start| Utc::now().signed_duration_since(start).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            started_at: self.started_at,
            duration_secs,
            bytes_submitted: self.buffer.bytes_submitted(),
            bytes_acknowledged: self.buffer.bytes_acknowledged(),
            bytes_pending: self.buffer.len() as u64,
            ..self.stats.clone()
        }
    }
}
