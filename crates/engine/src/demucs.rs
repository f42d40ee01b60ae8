//! Demucs CLI engine.
//!
//! Spawns `python3 -m demucs.separate` (configurable) once per job. Demucs
//! writes `<out>/<model>/<track>/<stem>.<ext>`; in two-stem mode it writes
//! `<target>` and `no_<target>` instead of the four canonical stems.

use tokio::process::Command;

use stemsplit_core::audio::AudioFormat;

use crate::config::EngineConfig;
use crate::engine::{EngineError, EngineJob, SeparationEngine};
use crate::subprocess;

/// [`SeparationEngine`] backed by the Demucs command line.
pub struct DemucsEngine {
    config: EngineConfig,
}

impl DemucsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Per-job command-line arguments (after [`EngineConfig::base_args`]).
    pub fn job_args(&self, job: &EngineJob) -> Vec<String> {
        let mut args = Vec::new();

        match self.config.output_format {
            AudioFormat::Mp3 { bitrate_kbps } => {
                args.extend(["--mp3".to_string(), "--mp3-bitrate".to_string()]);
                args.push(bitrate_kbps.to_string());
            }
            AudioFormat::Flac => args.push("--flac".into()),
            AudioFormat::Wav => {}
        }

        args.extend(["-n".to_string(), job.model.id().to_string()]);

        if let Some(target) = job.reduction_target {
            args.extend(["--two-stems".to_string(), target.as_str().to_string()]);
        }

        // A single pass is the engine's own default.
        if job.passes > 1 {
            args.extend(["--shifts".to_string(), job.passes.to_string()]);
        }

        if let Some(device) = &self.config.device {
            args.extend(["-d".to_string(), device.clone()]);
        }

        args.push("-o".into());
        args.push(job.output_dir.to_string_lossy().into_owned());
        args.push(job.input_path.to_string_lossy().into_owned());

        args
    }
}

#[async_trait::async_trait]
impl SeparationEngine for DemucsEngine {
    async fn separate(&self, job: &EngineJob) -> Result<(), EngineError> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.base_args).args(self.job_args(job));

        tracing::info!(
            program = %self.config.program,
            model = %job.model,
            reduction_target = ?job.reduction_target,
            passes = job.passes,
            input = %job.input_path.display(),
            "Starting separation engine",
        );

        let output = subprocess::run_command(&mut cmd, self.config.timeout)
            .await?
            .into_result()?;

        tracing::info!(
            duration_ms = output.duration_ms,
            model = %job.model,
            "Separation engine finished",
        );

        Ok(())
    }
}
