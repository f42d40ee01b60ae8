use std::time::Duration;

use stemsplit_core::audio::{AudioFormat, DEFAULT_MP3_BITRATE};

/// Default engine wall-clock budget per job (one hour).
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 3600;

/// How to launch the separation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Executable to spawn (default: `python3`).
    pub program: String,
    /// Arguments placed before the per-job arguments
    /// (default: `-m demucs.separate`).
    pub base_args: Vec<String>,
    /// Kill the engine if a single run takes longer than this.
    pub timeout: Duration,
    /// Optional inference device passed as `-d` (e.g. `cuda`, `cpu`).
    pub device: Option<String>,
    /// Encoding of the produced stems.
    pub output_format: AudioFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            base_args: vec!["-m".into(), "demucs.separate".into()],
            timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
            device: None,
            output_format: AudioFormat::default(),
        }
    }
}

impl EngineConfig {
    /// Load engine configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default              |
    /// |-----------------------|----------------------|
    /// | `ENGINE_PROGRAM`      | `python3`            |
    /// | `ENGINE_ARGS`         | `-m demucs.separate` |
    /// | `ENGINE_TIMEOUT_SECS` | `3600`               |
    /// | `ENGINE_DEVICE`       | unset                |
    /// | `OUTPUT_FORMAT`       | `mp3`                |
    /// | `MP3_BITRATE`         | `320`                |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let program = std::env::var("ENGINE_PROGRAM").unwrap_or(defaults.program);

        let base_args = std::env::var("ENGINE_ARGS")
            .map(|raw| raw.split_whitespace().map(String::from).collect())
            .unwrap_or(defaults.base_args);

        let timeout_secs: u64 = std::env::var("ENGINE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_ENGINE_TIMEOUT_SECS.to_string())
            .parse()
            .expect("ENGINE_TIMEOUT_SECS must be a valid u64");

        let device = std::env::var("ENGINE_DEVICE")
            .ok()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let mut output_format: AudioFormat = std::env::var("OUTPUT_FORMAT")
            .unwrap_or_else(|_| "mp3".into())
            .parse()
            .unwrap_or_else(|e| panic!("OUTPUT_FORMAT is invalid: {e}"));

        if let AudioFormat::Mp3 { bitrate_kbps } = &mut output_format {
            *bitrate_kbps = std::env::var("MP3_BITRATE")
                .unwrap_or_else(|_| DEFAULT_MP3_BITRATE.to_string())
                .parse()
                .expect("MP3_BITRATE must be a valid u32");
        }

        Self {
            program,
            base_args,
            timeout: Duration::from_secs(timeout_secs),
            device,
            output_format,
        }
    }
}
