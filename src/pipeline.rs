//! End-to-end driver: negotiate, open the session, feed it audio, stop.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::audio::{AudioFile, AudioSource, FileAudioSource};
use crate::config::Config;
use crate::negotiation::{InitiateRequest, NegotiationError, SessionNegotiator};
use crate::presenter::{ConsolePresenter, MessagePresenter};
use crate::session::{
    Connector, ForcedReconnectTimer, ResumableStreamSession, SessionConfig, SessionError,
    SessionStats, WsConnector,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Audio(#[from] anyhow::Error),
}

impl PipelineError {
    /// Process exit code: the HTTP status for negotiation rejections, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Negotiation(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Stream the configured input file through a freshly negotiated live session
pub async fn stream_file(cfg: &Config, api_key: &str) -> Result<SessionStats, PipelineError> {
    let audio = AudioFile::open(&cfg.input.file_path)?;

    let negotiator = SessionNegotiator::new(cfg.service.api_url.as_str(), api_key);
    let request = InitiateRequest {
        format: audio.format.clone(),
        streaming: cfg.streaming.clone(),
    };
    let live = negotiator.negotiate(&request).await?;

    let mut source =
        FileAudioSource::new(&audio, Duration::from_millis(cfg.input.chunk_duration_ms));

    stream_audio(
        &live.url,
        &mut source,
        cfg.session.session_config(),
        cfg.session.forced_reconnect_interval(),
        Arc::new(WsConnector::new()),
        Box::new(ConsolePresenter::new(cfg.presenter.show_partials)),
    )
    .await
}

/// Feed `source` into a resumable session on `url` until the source ends
/// and the server confirms the stop.
pub async fn stream_audio(
    url: &str,
    source: &mut dyn AudioSource,
    config: SessionConfig,
    forced_reconnect_interval: Option<Duration>,
    connector: Arc<dyn Connector>,
    presenter: Box<dyn MessagePresenter>,
) -> Result<SessionStats, PipelineError> {
    let (session, handle) = ResumableStreamSession::new(url, config, connector, presenter);
    let mut session_task = tokio::spawn(session.run());

    let mut chunks = match source.start().await {
        Ok(chunks) => chunks,
        Err(e) => {
            session_task.abort();
            return Err(e.into());
        }
    };
    println!("\n################ Begin session ################\n");

    let timer = forced_reconnect_interval.map(|period| ForcedReconnectTimer::arm(handle.clone(), period));

    let finished_early = loop {
        tokio::select! {
            chunk = chunks.recv() => match chunk {
                Some(chunk) => handle.submit_chunk(chunk.data),
                None => break None,
            },
            result = &mut session_task => break Some(result),
        }
    };

    if let Some(timer) = timer {
        timer.disarm();
    }

    let result = match finished_early {
        Some(result) => {
            info!("Session ended before {} finished", source.name());
            source.stop().await?;
            result?
        }
        None => {
            info!("{} finished, requesting stop", source.name());
            handle.request_stop();
            session_task.await?
        }
    };

    Ok(result?)
}
