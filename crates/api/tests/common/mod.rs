#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use stemsplit_api::config::ServerConfig;
use stemsplit_api::router::build_app_router;
use stemsplit_api::state::AppState;
use stemsplit_core::audio::AudioFormat;
use stemsplit_core::layout::OutputLayout;
use stemsplit_engine::{EngineError, EngineJob, SeparationEngine};
use stemsplit_pipeline::pool::Dispatcher;
use stemsplit_pipeline::{Pipeline, PipelineConfig};
use stemsplit_storage::local::LocalPublisher;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_upload_bytes: 1024 * 1024,
    }
}

// ---------------------------------------------------------------------------
// Stub engine
// ---------------------------------------------------------------------------

/// Writes every artifact the request expects, or fails with `failure`.
#[derive(Default)]
pub struct StubEngine {
    pub failure: Option<&'static str>,
    /// Only write these file stems.
    pub only: Option<Vec<&'static str>>,
}

#[async_trait::async_trait]
impl SeparationEngine for StubEngine {
    async fn separate(&self, job: &EngineJob) -> Result<(), EngineError> {
        if let Some(stderr) = self.failure {
            return Err(EngineError::Failed {
                exit_code: 1,
                stderr: stderr.into(),
            });
        }

        let layout = match job.reduction_target {
            Some(target) => OutputLayout::Reduced { target },
            None => OutputLayout::Full,
        };
        let track_dir = OutputLayout::track_dir(&job.output_dir, job.model, &job.input_path);
        tokio::fs::create_dir_all(&track_dir).await?;

        for artifact in layout.expected_artifacts(&track_dir, AudioFormat::default()) {
            let stem = artifact.role.file_stem();
            let wanted = self
                .only
                .as_ref()
                .map_or(true, |only| only.iter().any(|s| *s == stem));
            if wanted {
                tokio::fs::write(&artifact.path, stem.as_bytes()).await?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub pipeline: Pipeline,
    pub work_dir: PathBuf,
    pub files_dir: PathBuf,
    pub cancel: CancellationToken,
    /// Held (not run) when `run_dispatcher` is false so the queue stays open.
    _idle_dispatcher: Option<Dispatcher>,
    _dir: tempfile::TempDir,
}

pub struct TestOptions {
    pub engine: StubEngine,
    pub queue_capacity: usize,
    pub run_dispatcher: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            engine: StubEngine::default(),
            queue_capacity: 8,
            run_dispatcher: true,
        }
    }
}

/// Build the full application router with all middleware layers over a
/// temporary work directory and the local storage backend.
pub async fn build_test_app() -> TestApp {
    build_test_app_with(TestOptions::default()).await
}

pub async fn build_test_app_with(options: TestOptions) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let work_dir = dir.path().join("work");
    let files_dir = dir.path().join("published");
    tokio::fs::create_dir_all(&files_dir).await.unwrap();

    let pipeline_config = PipelineConfig {
        work_dir: work_dir.clone(),
        max_concurrent_jobs: 1,
        job_queue_capacity: options.queue_capacity,
    };
    let publisher = Arc::new(LocalPublisher::new(
        files_dir.clone(),
        "http://localhost:8000/files",
    ));

    let (pipeline, dispatcher) = Pipeline::build(
        &pipeline_config,
        Arc::new(options.engine),
        publisher,
        AudioFormat::default(),
    )
    .await
    .unwrap();

    let cancel = CancellationToken::new();
    let idle_dispatcher = if options.run_dispatcher {
        tokio::spawn(dispatcher.run(cancel.clone()));
        None
    } else {
        Some(dispatcher)
    };

    let config = test_config();
    let state = AppState {
        pipeline: pipeline.clone(),
        files_dir: Some(files_dir.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        pipeline,
        work_dir,
        files_dir,
        cancel,
        _idle_dispatcher: idle_dispatcher,
        _dir: dir,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "stemsplit-test-boundary";

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn audio(self) -> Self {
        self.file("file", "song.mp3", b"ID3\x03\x00fake-audio")
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Submit `form` and return the new job id.
pub async fn submit(app: &TestApp, form: Form) -> String {
    let response = send(app, form.into_request("/separate")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

/// Poll `/status/{id}` until the job is terminal.
pub async fn wait_terminal(app: &TestApp, id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let json = body_json(get(app, &format!("/status/{id}")).await).await;
        if matches!(json["status"].as_str(), Some("completed" | "failed")) {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not finish");
}

pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
