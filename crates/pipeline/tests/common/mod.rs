#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use stemsplit_core::audio::AudioFormat;
use stemsplit_core::layout::OutputLayout;
use stemsplit_core::request::SeparationRequest;
use stemsplit_engine::{EngineError, EngineJob, SeparationEngine};
use stemsplit_pipeline::config::PipelineConfig;
use stemsplit_pipeline::submission::Submitted;
use stemsplit_pipeline::Pipeline;
use stemsplit_storage::{ArtifactPublisher, PublicReference, PublishError};

// ---------------------------------------------------------------------------
// Fake engine
// ---------------------------------------------------------------------------

/// Writes stem files the way the real engine lays them out.
#[derive(Default)]
pub struct FakeEngine {
    /// File stems to write. `None` writes exactly what the request expects.
    pub only: Option<Vec<&'static str>>,
    /// Additional files written next to the stems.
    pub extra: Vec<&'static str>,
    /// Fail with this stderr text instead of producing output.
    pub failure: Option<&'static str>,
    /// When set, each run waits for one permit before finishing.
    pub gate: Option<Arc<Semaphore>>,
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeEngine {
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            },
            gate,
        )
    }
}

#[async_trait::async_trait]
impl SeparationEngine for FakeEngine {
    async fn separate(&self, job: &EngineJob) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if let Some(stderr) = self.failure {
            return Err(EngineError::Failed {
                exit_code: 1,
                stderr: stderr.to_string(),
            });
        }

        let track_dir = OutputLayout::track_dir(&job.output_dir, job.model, &job.input_path);
        tokio::fs::create_dir_all(&track_dir).await?;

        let stems: Vec<String> = match &self.only {
            Some(only) => only.iter().map(|s| s.to_string()).collect(),
            None => {
                let layout = match job.reduction_target {
                    Some(target) => OutputLayout::Reduced { target },
                    None => OutputLayout::Full,
                };
                layout
                    .expected_roles()
                    .into_iter()
                    .map(|role| role.file_stem())
                    .collect()
            }
        };

        for stem in stems {
            tokio::fs::write(track_dir.join(format!("{stem}.mp3")), stem.as_bytes()).await?;
        }
        for name in &self.extra {
            tokio::fs::write(track_dir.join(name), b"extra").await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory publisher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryPublisher {
    /// Fail uploads whose key contains this text.
    pub fail_on: Option<&'static str>,
    pub published: Mutex<Vec<String>>,
}

impl MemoryPublisher {
    pub fn keys(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ArtifactPublisher for MemoryPublisher {
    async fn publish(&self, local_path: &Path, key: &str) -> Result<PublicReference, PublishError> {
        assert!(local_path.is_file(), "artifact must exist while publishing");

        if self.fail_on.is_some_and(|needle| key.contains(needle)) {
            return Err(PublishError::Upload {
                key: key.to_string(),
                message: "bucket unreachable".into(),
            });
        }
        self.published.lock().unwrap().push(key.to_string());
        Ok(format!("https://cdn.test/{key}"))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub pipeline: Pipeline,
    pub engine: Arc<FakeEngine>,
    pub publisher: Arc<MemoryPublisher>,
    pub config: PipelineConfig,
    pub cancel: CancellationToken,
    pub dispatcher: Option<tokio::task::JoinHandle<TaskTracker>>,
    /// Held (not run) when `spawn_dispatcher` is false so the queue stays open.
    _idle_dispatcher: Option<stemsplit_pipeline::pool::Dispatcher>,
    _dir: tempfile::TempDir,
}

pub struct Limits {
    pub max_concurrent: usize,
    pub queue_capacity: usize,
    pub spawn_dispatcher: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            queue_capacity: 8,
            spawn_dispatcher: true,
        }
    }
}

pub async fn harness(engine: FakeEngine, publisher: MemoryPublisher) -> Harness {
    harness_with(engine, publisher, Limits::default()).await
}

pub async fn harness_with(engine: FakeEngine, publisher: MemoryPublisher, limits: Limits) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        work_dir: dir.path().to_path_buf(),
        max_concurrent_jobs: limits.max_concurrent,
        job_queue_capacity: limits.queue_capacity,
    };
    let engine = Arc::new(engine);
    let publisher = Arc::new(publisher);

    let (pipeline, dispatcher) = Pipeline::build(
        &config,
        engine.clone(),
        publisher.clone(),
        AudioFormat::default(),
    )
    .await
    .unwrap();

    let cancel = CancellationToken::new();
    let (dispatcher, idle_dispatcher) = if limits.spawn_dispatcher {
        (Some(tokio::spawn(dispatcher.run(cancel.clone()))), None)
    } else {
        (None, Some(dispatcher))
    };

    Harness {
        pipeline,
        engine,
        publisher,
        config,
        cancel,
        dispatcher,
        _idle_dispatcher: idle_dispatcher,
        _dir: dir,
    }
}

impl Harness {
    pub async fn submit(&self, request: SeparationRequest) -> Submitted {
        self.pipeline
            .submission
            .submit(Some("My Song.wav"), b"RIFF....WAVE", request)
            .await
            .unwrap()
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.config.uploads_dir()
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.config.jobs_dir()
    }

    /// Number of entries directly under `dir`.
    pub fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
