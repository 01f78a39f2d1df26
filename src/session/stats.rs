use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a streaming session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    /// When the session started connecting
    pub started_at: Option<DateTime<Utc>>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Audio bytes handed to the session by the producer
    pub bytes_submitted: u64,

    /// Highest offset the server confirmed
    pub bytes_acknowledged: u64,

    /// Bytes still waiting for acknowledgment
    pub bytes_pending: u64,

    /// Successful connection opens (including the first)
    pub connections_opened: u32,

    /// Reconnect attempts scheduled after an abrupt close
    pub reconnects: u32,

    /// Closes initiated by the forced-reconnect supervisor
    pub forced_reconnects: u32,

    /// Catch-up writes performed on open
    pub catch_up_writes: u32,

    /// Bytes resent by catch-up writes
    pub bytes_replayed: u64,

    /// Acknowledgments rejected for breaking offset monotonicity
    pub protocol_violations: u32,

    /// Inbound frames that could not be decoded
    pub malformed_messages: u32,

    /// Final transcript segments received
    pub final_transcripts: u32,

    /// Close code of the last connection, if it closed
    pub last_close_code: Option<u16>,
}
