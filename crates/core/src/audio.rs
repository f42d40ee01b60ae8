//! Output audio encoding for separated stems.

use std::str::FromStr;

/// Default MP3 bitrate in kbps.
pub const DEFAULT_MP3_BITRATE: u32 = 320;

/// Encoding the engine writes stems in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3 { bitrate_kbps: u32 },
    Flac,
    Wav,
}

impl AudioFormat {
    /// File extension (without dot) of stems in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 { .. } => "mp3",
            Self::Flac => "flac",
            Self::Wav => "wav",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Mp3 { .. } => "audio/mpeg",
            Self::Flac => "audio/flac",
            Self::Wav => "audio/wav",
        }
    }

    /// Look up the format for a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mp3 {
                bitrate_kbps: DEFAULT_MP3_BITRATE,
            }),
            "flac" => Some(Self::Flac),
            "wav" => Some(Self::Wav),
            _ => None,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::Mp3 {
            bitrate_kbps: DEFAULT_MP3_BITRATE,
        }
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
            .ok_or_else(|| format!("Unknown output format '{s}'. Must be one of: mp3, flac, wav"))
    }
}
