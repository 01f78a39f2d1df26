//! Resumable streaming session
//!
//! This module owns the live connection to the transcription service:
//! - Pending audio buffer, trimmed only by server acknowledgments
//! - Reconnect/replay protocol after abrupt closes
//! - Forced reconnects to keep the resume path exercised
//! - Decoding of inbound server messages

mod buffer;
mod config;
mod protocol;
mod session;
mod state;
mod stats;
mod supervisor;
mod transport;

pub use buffer::PendingAudioBuffer;
pub use config::{ReconnectPolicy, SessionConfig};
pub use protocol::{
    ClientMessage, ProtocolError, ServerMessage, Utterance, CLOSE_ABNORMAL,
    CLOSE_FORCED_RECONNECT, CLOSE_NORMAL, CLOSE_NO_STATUS,
};
pub use session::{ResumableStreamSession, SessionHandle};
pub use state::SessionState;
pub use stats::SessionStats;
pub use supervisor::ForcedReconnectTimer;
pub use transport::{Connector, OutboundFrame, TransportError, TransportEvent, WsConnector};

use thiserror::Error;

/// Failures that end a session. Everything else is absorbed and retried.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The very first connection could not be established
    #[error("initial connection failed: {0}")]
    InitialConnect(TransportError),

    /// The reconnect policy ran out of attempts
    #[error("gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },
}
