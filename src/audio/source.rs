use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::file::{AudioFile, AudioFormat};

/// A slice of the audio stream, in stream order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Chunk number (0-indexed) since the source was started
    pub sequence: u64,
    /// Raw PCM bytes
    pub data: Vec<u8>,
}

/// Producer of timed audio chunks
///
/// The returned channel closes when the stream ends; that is the
/// end-of-stream signal. Calling `start` again restarts from the beginning.
#[async_trait::async_trait]
pub trait AudioSource: Send {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>>;

    /// Stop producing chunks early
    async fn stop(&mut self) -> Result<()>;

    fn name(&self) -> &str;
}

/// Replays a WAV file at real-time cadence
pub struct FileAudioSource {
    name: String,
    data: Arc<Vec<u8>>,
    chunk_size: usize,
    chunk_interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl FileAudioSource {
    pub fn new(file: &AudioFile, chunk_interval: Duration) -> Self {
        let chunk_size = chunk_size_for(&file.format, chunk_interval);

        Self {
            name: format!("file:{}", file.path),
            data: Arc::new(file.data.clone()),
            chunk_size,
            chunk_interval,
            task: None,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Bytes per chunk for the given cadence, aligned to whole frames (never zero)
pub fn chunk_size_for(format: &AudioFormat, chunk_interval: Duration) -> usize {
    let frame = format.frame_size().max(1);
    let raw = (format.bytes_per_second() as u128 * chunk_interval.as_millis() / 1000) as usize;
    (raw / frame).max(1) * frame
}

#[async_trait::async_trait]
impl AudioSource for FileAudioSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        self.stop().await?;

        let (tx, rx) = mpsc::channel(64);
        let data = Arc::clone(&self.data);
        let chunk_size = self.chunk_size;
        let mut ticker = interval(self.chunk_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting {} ({} bytes, {} bytes per chunk)",
            self.name,
            data.len(),
            chunk_size
        );

        self.task = Some(tokio::spawn(async move {
            for (sequence, slice) in data.chunks(chunk_size).enumerate() {
                ticker.tick().await;
                let chunk = AudioChunk {
                    sequence: sequence as u64,
                    data: slice.to_vec(),
                };
                if tx.send(chunk).await.is_err() {
                    debug!("Audio consumer dropped, stopping file source");
                    return;
                }
            }
            info!("Audio file fully streamed");
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FileAudioSource {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
