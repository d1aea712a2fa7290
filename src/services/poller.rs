use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::models::job::{BatchJobStatus, BatchSnapshot};
use crate::models::table::TableQueryState;
use crate::services::backend::{BackendClient, BackendError};

/// Reads batch job status from the backend. Never retries and never caches.
pub struct StatusPoller {
    backend: Arc<BackendClient>,
}

impl StatusPoller {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }

    /// Current job status. The backend's `status` field is authoritative.
    pub async fn poll(&self) -> Result<BatchJobStatus, BackendError> {
        Ok(self.snapshot().await?.status)
    }

    /// Current job status together with the imported rows of that response.
    pub async fn snapshot(&self) -> Result<BatchSnapshot, BackendError> {
        let envelope = self.backend.fetch_status().await?;
        let snapshot = envelope.into_snapshot()?;
        metrics::counter!("status_polls_total").increment(1);
        debug!(
            status = %snapshot.status.status,
            last_file = ?snapshot.status.last_file_name,
            rows = snapshot.rows.len(),
            "Polled batch status"
        );
        Ok(snapshot)
    }

    /// Poll under a request token so a late response cannot replace a newer one.
    pub async fn poll_tracked(&self, tracker: &StatusTracker) -> Result<PollOutcome, BackendError> {
        let token = tracker.issue();
        let snapshot = self.snapshot().await?;
        let applied = tracker.apply(token, snapshot.status.clone()).await;
        if !applied {
            metrics::counter!("stale_status_responses_discarded").increment(1);
            debug!(token = token.0, "Discarded stale status response");
        }
        Ok(PollOutcome { snapshot, applied })
    }

    /// Past and current batch runs, newest first as ordered by the backend.
    pub async fn history(
        &self,
        query: Option<&TableQueryState>,
    ) -> Result<Vec<BatchJobStatus>, BackendError> {
        let envelopes = self.backend.fetch_processing_history(query).await?;
        let records = envelopes
            .iter()
            .map(|envelope| envelope.to_status())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub snapshot: BatchSnapshot,
    /// False when a newer response had already been applied.
    pub applied: bool,
}

/// Monotonic token attached to one status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

#[derive(Debug, Default)]
struct Applied {
    token: u64,
    status: Option<BatchJobStatus>,
}

/// Last applied status of one session, guarded by request tokens.
#[derive(Debug, Default)]
pub struct StatusTracker {
    issued: AtomicU64,
    applied: Mutex<Applied>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestToken {
        RequestToken(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Record `status` unless a response for a newer token was already applied.
    pub async fn apply(&self, token: RequestToken, status: BatchJobStatus) -> bool {
        let mut applied = self.applied.lock().await;
        if token.0 <= applied.token {
            return false;
        }
        applied.token = token.0;
        applied.status = Some(status);
        true
    }

    /// Last applied status, `None` before the first poll completes.
    pub async fn current(&self) -> Option<BatchJobStatus> {
        self.applied.lock().await.status.clone()
    }

    pub async fn is_processing(&self) -> bool {
        self.applied
            .lock()
            .await
            .status
            .as_ref()
            .is_some_and(BatchJobStatus::is_processing)
    }
}
