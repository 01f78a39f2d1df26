pub mod file;
pub mod source;

pub use file::{AudioFile, AudioFormat};
pub use source::{chunk_size_for, AudioChunk, AudioSource, FileAudioSource};
