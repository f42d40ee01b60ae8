use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stemsplit_api::config::ServerConfig;
use stemsplit_api::router::build_app_router;
use stemsplit_api::state::AppState;
use stemsplit_engine::{DemucsEngine, EngineConfig};
use stemsplit_pipeline::{Pipeline, PipelineConfig};
use stemsplit_storage::StorageConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();
    let engine_config = EngineConfig::from_env();
    let storage_config = StorageConfig::from_env(&pipeline_config.work_dir);
    tracing::info!(
        host = %config.host,
        port = %config.port,
        engine = %engine_config.program,
        output_format = engine_config.output_format.extension(),
        storage_backend = storage_config.backend.name(),
        "Loaded server configuration",
    );

    // --- Result storage ---
    let publisher = storage_config
        .build_publisher()
        .await
        .expect("Failed to initialise result storage");

    // --- Job pipeline ---
    let output_format = engine_config.output_format;
    let engine = Arc::new(DemucsEngine::new(engine_config));
    let (pipeline, dispatcher) = Pipeline::build(&pipeline_config, engine, publisher, output_format)
        .await
        .expect("Failed to prepare work directory");

    let dispatcher_cancel = CancellationToken::new();
    let dispatcher_handle = tokio::spawn(dispatcher.run(dispatcher_cancel.clone()));

    // --- App state ---
    let state = AppState {
        pipeline,
        files_dir: storage_config.local_publish_dir().map(Path::to_path_buf),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining jobs");

    dispatcher_cancel.cancel();
    match dispatcher_handle.await {
        Ok(workers) => {
            let timeout = Duration::from_secs(config.shutdown_timeout_secs);
            if tokio::time::timeout(timeout, workers.wait()).await.is_err() {
                tracing::warn!(
                    timeout_secs = config.shutdown_timeout_secs,
                    "Running jobs did not finish before the shutdown timeout",
                );
            }
        }
        Err(e) => tracing::error!(error = %e, "Job dispatcher task failed"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Install the global tracing subscriber. `LOG_FORMAT=json` switches the
/// fmt layer to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "stemsplit_api=debug,stemsplit_pipeline=debug,stemsplit_engine=info,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
