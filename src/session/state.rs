/// Lifecycle of a streaming session after negotiation.
///
/// ```text
/// Connecting ──▶ Open ──▶ Closing ──┐
///     ▲            │                ▼
///     └──────── AbruptlyClosed ◀────┘──▶ Terminated
/// ```
///
/// `FatalAborted` is reached when the first connection cannot be
/// established or the reconnect policy gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    /// Local close requested, waiting for the transport to report it
    Closing,
    /// Closed with a non-normal code; a reconnect is scheduled
    AbruptlyClosed { code: u16 },
    Terminated { code: u16 },
    FatalAborted,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }
}
