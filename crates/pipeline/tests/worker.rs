mod common;

use std::collections::HashSet;

use assert_matches::assert_matches;

use stemsplit_core::job::{JobState, JobStatus};
use stemsplit_core::models::SeparationModel;
use stemsplit_core::request::SeparationRequest;
use stemsplit_core::stems::Stem;
use stemsplit_pipeline::worker::JobOutcome;

use common::{harness, FakeEngine, Harness, MemoryPublisher};

fn full() -> SeparationRequest {
    SeparationRequest::default()
}

fn reduced(target: Stem) -> SeparationRequest {
    SeparationRequest {
        model: SeparationModel::HtdemucsFt,
        reduction_target: Some(target),
        passes: 2,
    }
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_mode_completes_with_four_distinct_references() {
    let h = harness(FakeEngine::default(), MemoryPublisher::default()).await;
    let submitted = h.submit(full()).await;
    let id = submitted.id();

    let result = match submitted.completion.outcome().await {
        Some(JobOutcome::Completed(result)) => result,
        other => panic!("expected completion, got {other:?}"),
    };

    let refs: Vec<&str> = Stem::ALL.iter().map(|s| result.get(*s)).collect();
    for (stem, reference) in Stem::ALL.iter().zip(&refs) {
        assert_eq!(*reference, format!("https://cdn.test/{id}/{stem}.mp3"));
    }
    let unique: HashSet<&str> = refs.iter().copied().collect();
    assert_eq!(unique.len(), 4);

    let record = h.pipeline.store.get(id).await.unwrap();
    assert_eq!(record.state, JobState::Completed { result });
    assert_eq!(record.state.progress(), 1.0);
}

#[tokio::test]
async fn reduced_mode_replicates_complement() {
    let h = harness(FakeEngine::default(), MemoryPublisher::default()).await;
    let submitted = h.submit(reduced(Stem::Vocals)).await;
    let id = submitted.id();

    let JobOutcome::Completed(result) = submitted.completion.outcome().await.unwrap() else {
        panic!("expected completion");
    };

    assert_eq!(result.vocals, format!("https://cdn.test/{id}/vocals.mp3"));
    let complement = format!("https://cdn.test/{id}/no_vocals.mp3");
    assert_eq!(result.drums, complement);
    assert_eq!(result.bass, complement);
    assert_eq!(result.other, complement);
    assert_eq!(h.publisher.keys().len(), 2);
}

#[tokio::test]
async fn extra_engine_files_are_ignored() {
    let engine = FakeEngine {
        extra: vec!["log.txt", "guitar.mp3"],
        ..FakeEngine::default()
    };
    let h = harness(engine, MemoryPublisher::default()).await;

    let outcome = h.submit(full()).await.completion.outcome().await.unwrap();
    assert!(outcome.is_completed());
    assert!(h.publisher.keys().iter().all(|k| !k.contains("guitar")));
    assert_eq!(h.publisher.keys().len(), 4);
}

#[tokio::test]
async fn repeated_reads_of_terminal_job_are_identical() {
    let h = harness(FakeEngine::default(), MemoryPublisher::default()).await;
    let submitted = h.submit(full()).await;
    let id = submitted.id();
    submitted.completion.outcome().await.unwrap();

    let first = h.pipeline.store.get(id).await.unwrap();
    let second = h.pipeline.store.get(id).await.unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_of_four_stems_fails_naming_missing_stem() {
    let engine = FakeEngine {
        only: Some(vec!["vocals", "drums", "other"]),
        ..FakeEngine::default()
    };
    let h = harness(engine, MemoryPublisher::default()).await;
    let submitted = h.submit(full()).await;
    let id = submitted.id();

    let outcome = submitted.completion.outcome().await.unwrap();
    assert_eq!(outcome, JobOutcome::Failed("missing stems: bass".into()));

    let record = h.pipeline.store.get(id).await.unwrap();
    assert_eq!(record.state.status(), JobStatus::Failed);
    assert_eq!(record.state.error(), Some("missing stems: bass"));
    assert!(record.state.result().is_none());

    // Discovery runs before publishing.
    assert!(h.publisher.keys().is_empty());
    assert!(!record.input_path.exists());
    assert_eq!(Harness::entries(&h.jobs_dir()), 0);
}

#[tokio::test]
async fn zero_outputs_reports_every_stem_missing() {
    let engine = FakeEngine {
        only: Some(vec![]),
        ..FakeEngine::default()
    };
    let h = harness(engine, MemoryPublisher::default()).await;

    let outcome = h.submit(reduced(Stem::Drums)).await.completion.outcome().await.unwrap();
    assert_eq!(outcome, JobOutcome::Failed("missing stems: drums, no_drums".into()));
}

#[tokio::test]
async fn engine_failure_records_engine_text() {
    let engine = FakeEngine {
        failure: Some("RuntimeError: CUDA out of memory"),
        ..FakeEngine::default()
    };
    let h = harness(engine, MemoryPublisher::default()).await;
    let submitted = h.submit(full()).await;
    let id = submitted.id();

    assert_matches!(
        submitted.completion.outcome().await,
        Some(JobOutcome::Failed(msg)) if msg.contains("CUDA out of memory")
    );

    let record = h.pipeline.store.get(id).await.unwrap();
    assert_eq!(record.state.status(), JobStatus::Failed);
    // Failed after the engine checkpoint, before discovery.
    assert_eq!(record.state.progress(), 0.2);
    assert_eq!(Harness::entries(&h.uploads_dir()), 0);
    assert_eq!(Harness::entries(&h.jobs_dir()), 0);
}

#[tokio::test]
async fn publish_failure_mid_way_fails_and_cleans_up() {
    let publisher = MemoryPublisher {
        fail_on: Some("bass"),
        ..MemoryPublisher::default()
    };
    let h = harness(FakeEngine::default(), publisher).await;
    let submitted = h.submit(full()).await;
    let id = submitted.id();

    assert_matches!(
        submitted.completion.outcome().await,
        Some(JobOutcome::Failed(msg)) if msg.contains("bucket unreachable")
    );

    let record = h.pipeline.store.get(id).await.unwrap();
    assert!(record.state.result().is_none());
    assert_eq!(record.state.progress(), 0.8);
    // vocals and drums went out before the failure.
    assert_eq!(h.publisher.keys().len(), 2);
    assert!(!record.input_path.exists());
    assert_eq!(Harness::entries(&h.jobs_dir()), 0);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_after_submission_is_not_terminal() {
    let (engine, gate) = FakeEngine::gated();
    let h = harness(engine, MemoryPublisher::default()).await;
    let submitted = h.submit(full()).await;
    let id = submitted.id();

    let status = h.pipeline.store.get(id).await.unwrap().state.status();
    assert!(matches!(status, JobStatus::Queued | JobStatus::Processing));

    gate.add_permits(1);
    assert!(submitted.completion.outcome().await.unwrap().is_completed());
}

#[tokio::test]
async fn staged_input_keeps_upload_extension() {
    let (engine, gate) = FakeEngine::gated();
    let h = harness(engine, MemoryPublisher::default()).await;
    let submitted = h.submit(full()).await;

    let input = submitted.record.input_path.clone();
    assert_eq!(input.extension().and_then(|e| e.to_str()), Some("wav"));
    assert_eq!(
        input.file_stem().and_then(|s| s.to_str()),
        Some(submitted.id().to_string().as_str())
    );
    assert!(input.is_file());

    gate.add_permits(1);
    submitted.completion.outcome().await.unwrap();
    assert!(!input.exists());
}
