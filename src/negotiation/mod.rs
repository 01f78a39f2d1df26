//! Session negotiation
//!
//! One-shot HTTP exchange that turns the audio format and streaming
//! configuration into a live session: the server answers with the session
//! id and the WebSocket `url` the streaming session connects to.

mod client;
mod messages;

pub use client::{SessionNegotiator, LIVE_ENDPOINT_PATH};
pub use messages::{InitiateRequest, InitiateResponse, LanguageConfig, StreamingConfig};

use thiserror::Error;

/// Errors that can occur before a session exists. All of them are fatal.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// Network failure or unreadable response body
    #[error("session negotiation request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Error {status}: {body}")]
    Rejected { status: u16, body: String },

    /// 2xx response that is not a valid session description
    #[error("invalid negotiation response: {0}")]
    InvalidResponse(String),
}

impl NegotiationError {
    /// Process exit code for this failure: the HTTP status when the server rejected us
    pub fn exit_code(&self) -> i32 {
        match self {
            NegotiationError::Rejected { status, .. } => i32::from(*status),
            _ => 1,
        }
    }
}
