//! Duplex transport seam
//!
//! A [`Connector`] opens one connection per call. The session talks to it
//! through two channels: outbound frames go in through the returned sender,
//! inbound text frames come back on the `inbound` sender handed to
//! `connect`, followed by exactly one [`TransportEvent::Closed`] when the
//! connection ends for any reason.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
};
use tracing::{debug, info, warn};

use super::protocol::{ClientMessage, CLOSE_ABNORMAL, CLOSE_NO_STATUS};

/// Timeout for the WebSocket handshake
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a peer has to answer our close frame before the socket is dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    Connect(String),
}

/// Frames written to the server, in submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Audio(Vec<u8>),
    Control(ClientMessage),
    /// Initiate a close handshake with the given status code
    Close { code: u16, reason: String },
}

/// What a live connection reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Closed { code: u16, reason: String },
}

#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        inbound: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<mpsc::UnboundedSender<OutboundFrame>, TransportError>;
}

/// WebSocket connector backed by tokio-tungstenite
pub struct WsConnector {
    connect_timeout: Duration,
    close_timeout: Duration,
}

impl WsConnector {
    pub fn new() -> Self {
        Self {
            connect_timeout: CONNECTION_TIMEOUT,
            close_timeout: CLOSE_TIMEOUT,
        }
    }

    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..Self::new()
        }
    }

    pub fn close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
        inbound: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<mpsc::UnboundedSender<OutboundFrame>, TransportError> {
        let (ws_stream, _response) = timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| TransportError::Connect("connection timeout".to_string()))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        debug!("WebSocket handshake complete");

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        // Fires (or drops) once the writer starts closing the connection
        let (closing_tx, closing_rx) = oneshot::channel::<()>();

        // Writer: drains outbound frames until the session lets go of the sender
        let writer = tokio::spawn(async move {
            let mut closing_tx = Some(closing_tx);
            while let Some(frame) = outbound_rx.recv().await {
                let message = match frame {
                    OutboundFrame::Audio(bytes) => Message::Binary(bytes),
                    OutboundFrame::Control(msg) => match serde_json::to_string(&msg) {
                        Ok(json) => Message::Text(json),
                        Err(e) => {
                            warn!("Failed to encode control message: {}", e);
                            continue;
                        }
                    },
                    OutboundFrame::Close { code, reason } => Message::Close(Some(CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    })),
                };

                let closing = matches!(message, Message::Close(_));
                if closing {
                    if let Some(tx) = closing_tx.take() {
                        let _ = tx.send(());
                    }
                }
                if let Err(e) = write.send(message).await {
                    debug!("WebSocket send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            drop(closing_tx);
            if let Err(e) = write.close().await {
                debug!("WebSocket writer close: {}", e);
            }
        });

        // Reader: forwards text frames and returns how the connection closed
        let mut reader = tokio::spawn({
            let inbound = inbound.clone();
            async move {
                let mut close: Option<(u16, String)> = None;

                while let Some(result) = read.next().await {
                    match result {
                        Ok(Message::Text(text)) => {
                            if inbound.send(TransportEvent::Message(text)).is_err() {
                                debug!("Session stopped listening");
                            }
                        }
                        Ok(Message::Close(frame)) => {
                            close = Some(match frame {
                                Some(frame) => (u16::from(frame.code), frame.reason.into_owned()),
                                None => (CLOSE_NO_STATUS, String::new()),
                            });
                        }
                        Ok(_) => {} // Ignore ping/pong/binary
                        Err(e) => {
                            if close.is_none() {
                                warn!("WebSocket error: {}", e);
                            }
                            break;
                        }
                    }
                }

                close.unwrap_or_else(|| (CLOSE_ABNORMAL, "connection lost".to_string()))
            }
        });

        // Reports the close exactly once. After the writer starts closing, the
        // peer gets `close_timeout` to finish the handshake.
        let close_timeout = self.close_timeout;
        tokio::spawn(async move {
            let handshake_deadline = async {
                let _ = closing_rx.await;
                tokio::time::sleep(close_timeout).await;
            };

            let (code, reason) = tokio::select! {
                result = &mut reader => result.unwrap_or_else(|e| {
                    warn!("WebSocket reader failed: {}", e);
                    (CLOSE_ABNORMAL, "reader failed".to_string())
                }),
                _ = handshake_deadline => {
                    warn!("Close handshake timed out after {:?}, dropping connection", close_timeout);
                    reader.abort();
                    (CLOSE_ABNORMAL, "close handshake timed out".to_string())
                }
            };

            writer.abort();
            info!("WebSocket closed with code {}", code);
            let _ = inbound.send(TransportEvent::Closed { code, reason });
        });

        Ok(outbound_tx)
    }
}
