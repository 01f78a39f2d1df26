use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Wire description of the PCM payload, sent at negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub channels: u16,
}

impl AudioFormat {
    /// Bytes for one sample across all channels
    pub fn frame_size(&self) -> usize {
        usize::from(self.bit_depth / 8) * usize::from(self.channels)
    }

    pub fn bytes_per_second(&self) -> usize {
        self.frame_size() * self.sample_rate as usize
    }
}

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub format: AudioFormat,
    /// Interleaved little-endian PCM, without the WAV header
    pub data: Vec<u8>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int {
            anyhow::bail!("Only integer PCM WAV files are supported");
        }

        let bytes_per_sample = match spec.bits_per_sample {
            8 | 16 | 24 | 32 => usize::from(spec.bits_per_sample / 8),
            bits => anyhow::bail!("Unsupported bit depth: {}", bits),
        };

        let samples: Vec<i32> = reader
            .into_samples::<i32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let mut data = Vec::with_capacity(samples.len() * bytes_per_sample);
        for sample in &samples {
            if bytes_per_sample == 1 {
                // 8-bit WAV is unsigned on disk; hound hands it back centered on zero
                data.push((sample + 128) as u8);
            } else {
                data.extend_from_slice(&sample.to_le_bytes()[..bytes_per_sample]);
            }
        }

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {}-bit, {} channels, {} bytes",
            duration_seconds,
            spec.sample_rate,
            spec.bits_per_sample,
            spec.channels,
            data.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            format: AudioFormat {
                encoding: "wav/pcm".to_string(),
                sample_rate: spec.sample_rate,
                bit_depth: spec.bits_per_sample,
                channels: spec.channels,
            },
            data,
        })
    }
}
