pub mod audio;
pub mod config;
pub mod negotiation;
pub mod pipeline;
pub mod presenter;
pub mod session;

pub use audio::{AudioChunk, AudioFile, AudioFormat, AudioSource, FileAudioSource};
pub use config::{Config, ConfigError};
pub use negotiation::{
    InitiateRequest, InitiateResponse, LanguageConfig, NegotiationError, SessionNegotiator,
    StreamingConfig,
};
pub use pipeline::{stream_audio, stream_file, PipelineError};
pub use presenter::{ConsoleLine, ConsolePresenter, MessagePresenter};
pub use session::{
    Connector, ForcedReconnectTimer, OutboundFrame, PendingAudioBuffer, ReconnectPolicy,
    ResumableStreamSession, ServerMessage, SessionConfig, SessionError, SessionHandle,
    SessionState, SessionStats, TransportError, TransportEvent, WsConnector,
};
