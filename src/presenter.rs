//! Human-readable rendering of server messages

use std::io::Write;

use crate::session::{ServerMessage, Utterance};

/// Renders decoded server messages for a human observer
pub trait MessagePresenter: Send {
    fn present(&mut self, message: &ServerMessage);
}

/// Prints transcripts to stdout and server errors to stderr
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    show_partials: bool,
}

/// One rendered piece of console output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    /// Full line on stdout
    Out(String),
    /// Rewritten in place on stdout until the final transcript replaces it
    Partial(String),
    Err(String),
}

impl ConsolePresenter {
    /// `show_partials` prints interim transcripts while they refine
    pub fn new(show_partials: bool) -> Self {
        Self { show_partials }
    }

    pub fn render(&self, message: &ServerMessage) -> Option<ConsoleLine> {
        match message {
            ServerMessage::FinalTranscript(utterance) => {
                Some(ConsoleLine::Out(format_utterance(utterance)))
            }
            ServerMessage::PartialTranscript(utterance) if self.show_partials => {
                Some(ConsoleLine::Partial(format!("~ {}", utterance.text.trim())))
            }
            ServerMessage::SessionEnded => Some(ConsoleLine::Out(
                "\n################ End of session ################\n".to_string(),
            )),
            ServerMessage::Error { message } => {
                Some(ConsoleLine::Err(format!("Server error: {}", message)))
            }
            ServerMessage::AudioRejected { reason } => {
                Some(ConsoleLine::Err(format!("Audio chunk rejected: {}", reason)))
            }
            _ => None,
        }
    }
}

impl MessagePresenter for ConsolePresenter {
    fn present(&mut self, message: &ServerMessage) {
        match self.render(message) {
            Some(ConsoleLine::Out(line)) => println!("{}", line),
            Some(ConsoleLine::Partial(line)) => {
                print!("\r{}", line);
                std::io::stdout().flush().ok();
            }
            Some(ConsoleLine::Err(line)) => eprintln!("{}", line),
            None => {}
        }
    }
}

/// `00:00:01.230 --> 00:00:03.400 | en | text`
pub fn format_utterance(utterance: &Utterance) -> String {
    format!(
        "{} --> {} | {} | {}",
        format_timestamp(utterance.start),
        format_timestamp(utterance.end),
        utterance.language.as_deref().unwrap_or("??"),
        utterance.text.trim()
    )
}

/// Seconds as `HH:MM:SS.mmm`
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        ms
    )
}
