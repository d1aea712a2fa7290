use sewer_batch_import::{
    config::WatcherConfig,
    models::job::{BatchJobStatus, JobState},
    services::{
        backend::BackendClient,
        poller::{StatusPoller, StatusTracker},
    },
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Consecutive idle polls after which no batch is assumed to be running.
const MAX_IDLE_POLLS: u32 = 3;

#[derive(Debug, PartialEq, Eq)]
enum Watch {
    Continue,
    Finished,
    NothingRunning,
}

fn next_step(status: &BatchJobStatus, idle_polls: u32) -> Watch {
    match status.status {
        JobState::Done => Watch::Finished,
        JobState::Idle if idle_polls >= MAX_IDLE_POLLS => Watch::NothingRunning,
        JobState::Idle | JobState::Processing => Watch::Continue,
    }
}

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting sewer batch status watcher");

    let config = WatcherConfig::from_env().expect("Failed to load configuration");

    let backend = BackendClient::new(
        &config.backend_base_url,
        config.backend_token.clone(),
        Duration::from_secs(config.backend_timeout_secs),
    )
    .expect("Failed to initialize backend client");
    let poller = StatusPoller::new(Arc::new(backend));
    let tracker = StatusTracker::new();

    let mut interval = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    let mut idle_polls = 0u32;
    let mut last_description = String::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping watcher");
                return;
            }
        }

        let status = match poller.poll_tracked(&tracker).await {
            Ok(outcome) if outcome.applied => outcome.snapshot.status,
            Ok(_) => continue,
            Err(e) => {
                // Next tick is the retry
                tracing::error!(error = %e, "Status poll failed");
                continue;
            }
        };

        let description = status.description();
        if description != last_description {
            tracing::info!(
                status = %status.status,
                last_file = ?status.last_file_name,
                description = %description,
                "Batch status changed"
            );
            last_description = description;
        }

        idle_polls = if status.status == JobState::Idle {
            idle_polls + 1
        } else {
            0
        };

        match next_step(&status, idle_polls) {
            Watch::Continue => tracing::trace!("Batch still pending"),
            Watch::Finished => {
                tracing::info!(finished_at = ?status.finished_at, "Batch processing finished");
                return;
            }
            Watch::NothingRunning => {
                tracing::warn!(idle_polls, "No batch is running, stopping watcher");
                return;
            }
        }
    }
}
