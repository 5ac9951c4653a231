//! Answer acquisition from the technician.
//!
//! Answers arrive either as typed lines or as spoken utterances. The
//! [`InputChannel`] hides which one is active and switches between them
//! when the user asks or when voice capture comes back empty.

mod channel;
mod choice;
mod console;
mod voice;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use channel::{InputChannel, DEFAULT_VOICE_SENTINEL};
pub use choice::parse_choice;
pub use console::Console;
pub use voice::{CommandSpeech, RecordingSession, SpeechCapture};

#[cfg(test)]
pub(crate) use console::testing;

/// How answers are acquired.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Typed lines on the terminal
    #[default]
    Text,
    /// Recorded and transcribed speech
    Voice,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Voice => f.write_str("voice"),
        }
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            other => Err(format!("unknown input mode '{other}' (expected text or voice)")),
        }
    }
}

/// Errors that can occur while acquiring input.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input stream reached its end.
    #[error("input stream closed")]
    Closed,

    /// Reading or writing the terminal failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Recording or transcription failed.
    #[error("voice capture failed: {0}")]
    Voice(String),
}
