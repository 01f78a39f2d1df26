//! Wire protocol of the streaming connection
//!
//! Outbound: raw binary audio frames and a single JSON control frame
//! (`{"type":"stop_recording"}`). Inbound: JSON objects discriminated by
//! `type`; only `audio_chunk` acknowledgments drive session state, the
//! rest is presented to the user.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Normal closure; ends the session
pub const CLOSE_NORMAL: u16 = 1000;
/// Peer closed without a status code
pub const CLOSE_NO_STATUS: u16 = 1005;
/// Connection dropped without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;
/// Locally forced closure requesting a reconnect
pub const CLOSE_FORCED_RECONNECT: u16 = 4500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed server message: {0}")]
    Malformed(String),

    #[error("acknowledgment offset {offset} regresses below {acknowledged}")]
    AckRegression { offset: u64, acknowledged: u64 },

    #[error("acknowledgment offset {offset} exceeds {submitted} submitted bytes")]
    AckBeyondSubmitted { offset: u64, submitted: u64 },
}

/// Control messages sent to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StopRecording,
}

/// A recognized span of speech
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Utterance {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Seconds since the start of the stream
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Decoded inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    PartialTranscript(Utterance),
    FinalTranscript(Utterance),
    /// Server holds every byte up to this absolute offset
    AudioAcknowledged { byte_range_end: u64 },
    /// Server received an audio frame but did not accept it
    AudioRejected { reason: String },
    StopAcknowledged,
    SessionEnded,
    Error { message: String },
    /// Any other lifecycle event (`start_session`, `speech_start`, ...)
    Lifecycle { kind: String },
}

#[derive(Deserialize)]
struct AudioChunkMessage {
    #[serde(default)]
    acknowledged: bool,
    #[serde(default)]
    data: Option<AudioChunkData>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct AudioChunkData {
    byte_range: [u64; 2],
}

#[derive(Deserialize)]
struct TranscriptMessage {
    data: TranscriptData,
}

#[derive(Deserialize)]
struct TranscriptData {
    #[serde(default)]
    is_final: bool,
    utterance: Utterance,
}

#[derive(Deserialize)]
struct AcknowledgedMessage {
    #[serde(default)]
    acknowledged: bool,
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::Malformed("missing `type` field".to_string()))?
            .to_string();

        match kind.as_str() {
            "audio_chunk" => {
                let msg: AudioChunkMessage = from_value(value)?;
                match (msg.acknowledged, msg.data) {
                    (true, Some(data)) => {
                        let [start, end] = data.byte_range;
                        if end < start {
                            return Err(ProtocolError::Malformed(format!(
                                "inverted byte range [{}, {}]",
                                start, end
                            )));
                        }
                        Ok(ServerMessage::AudioAcknowledged { byte_range_end: end })
                    }
                    (true, None) => Err(ProtocolError::Malformed(
                        "acknowledged audio_chunk without byte_range".to_string(),
                    )),
                    (false, _) => Ok(ServerMessage::AudioRejected {
                        reason: msg
                            .error
                            .map(|e| describe(&e))
                            .unwrap_or_else(|| "not acknowledged".to_string()),
                    }),
                }
            }
            "transcript" => {
                let msg: TranscriptMessage = from_value(value)?;
                if msg.data.is_final {
                    Ok(ServerMessage::FinalTranscript(msg.data.utterance))
                } else {
                    Ok(ServerMessage::PartialTranscript(msg.data.utterance))
                }
            }
            "stop_recording" => {
                let msg: AcknowledgedMessage = from_value(value)?;
                if msg.acknowledged {
                    Ok(ServerMessage::StopAcknowledged)
                } else {
                    Ok(ServerMessage::Lifecycle { kind })
                }
            }
            "end_session" => Ok(ServerMessage::SessionEnded),
            "error" => {
                let message = value
                    .get("error")
                    .or_else(|| value.get("message"))
                    .or_else(|| value.get("data"))
                    .map(describe)
                    .unwrap_or_else(|| value.to_string());
                Ok(ServerMessage::Error { message })
            }
            _ => Ok(ServerMessage::Lifecycle { kind }),
        }
    }
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Human-readable text for an error payload that may be a string or an object
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}
