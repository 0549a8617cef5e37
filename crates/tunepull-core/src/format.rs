//! Output audio format selection.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Audio formats a download can be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Advanced Audio Coding.
    Aac,
    /// Free Lossless Audio Codec.
    Flac,
    /// MPEG-1 Audio Layer III (the default).
    #[default]
    Mp3,
    /// MPEG-4 audio container.
    M4a,
    /// Opus.
    Opus,
    /// Ogg Vorbis.
    Vorbis,
    /// Waveform audio.
    Wav,
}

impl AudioFormat {
    /// File extension used for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Opus => "opus",
            Self::Vorbis => "ogg",
            Self::Wav => "wav",
        }
    }

    /// Parse a user-supplied format name.
    ///
    /// Unsupported names fall back to mp3 with a warning instead of failing
    /// the run.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "aac" => Self::Aac,
            "flac" => Self::Flac,
            "mp3" => Self::Mp3,
            "m4a" => Self::M4a,
            "opus" => Self::Opus,
            "vorbis" => Self::Vorbis,
            "wav" => Self::Wav,
            other => {
                warn!("unsupported audio format {other:?}, falling back to mp3");
                Self::Mp3
            }
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aac => write!(f, "aac"),
            Self::Flac => write!(f, "flac"),
            Self::Mp3 => write!(f, "mp3"),
            Self::M4a => write!(f, "m4a"),
            Self::Opus => write!(f, "opus"),
            Self::Vorbis => write!(f, "vorbis"),
            Self::Wav => write!(f, "wav"),
        }
    }
}
