use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::models::critique::{CritiqueRow, ProcessRequest, UpdateRequest};
use crate::models::job::BatchJobStatus;
use crate::models::notification::{Notification, Notifier};
use crate::services::backend::{BackendClient, BackendError};
use crate::services::permissions::ResolvedPermissions;
use crate::services::validation::ValidationError;

const PROCESSED_MESSAGE: &str = "Processed records were forwarded to monitoring.";
const UPDATED_MESSAGE: &str = "Records without critique were sent for update.";
const GENERIC_FAILURE: &str = "Could not process the batch. Try again later.";

/// Why a confirmation was silently ignored.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoWritePermission,
    JobProcessing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// No request was sent and nothing should be shown.
    Skipped(SkipReason),
    Dispatched(Notification),
    /// The backend refused or could not be reached.
    Failed(Notification),
}

/// Sends validated rows to the backend once nothing blocks them.
pub struct ConfirmationDispatcher {
    backend: Arc<BackendClient>,
    notifier: Notifier,
}

impl ConfirmationDispatcher {
    pub fn new(backend: Arc<BackendClient>, notifier: Notifier) -> Self {
        Self { backend, notifier }
    }

    /// Dispatch the full row set for processing.
    ///
    /// Checks, in order: write permission, job not processing, at least one
    /// row without critique, a known originating file name.
    pub async fn confirm(
        &self,
        permissions: &ResolvedPermissions,
        status: Option<&BatchJobStatus>,
        rows: Vec<CritiqueRow>,
    ) -> Result<ConfirmOutcome, ValidationError> {
        if let Some(reason) = skip_reason(permissions, status) {
            return Ok(ConfirmOutcome::Skipped(reason));
        }
        ensure_processable(&rows)?;

        let file_name = status
            .and_then(|s| s.last_file_name.clone())
            .ok_or(ValidationError::MissingField("nomeArquivo"))?;

        info!(file = %file_name, rows = rows.len(), "Dispatching batch for processing");
        let request = ProcessRequest { file_name, rows };
        let result = self.backend.process_batch(&request).await;
        Ok(self.outcome(result, PROCESSED_MESSAGE))
    }

    /// Send only the ids of rows without critique for property update.
    pub async fn confirm_selected(
        &self,
        permissions: &ResolvedPermissions,
        status: Option<&BatchJobStatus>,
        rows: &[CritiqueRow],
    ) -> Result<ConfirmOutcome, ValidationError> {
        if let Some(reason) = skip_reason(permissions, status) {
            return Ok(ConfirmOutcome::Skipped(reason));
        }
        ensure_processable(rows)?;

        let ids: Vec<i64> = rows
            .iter()
            .filter(|row| !row.is_blocking())
            .map(|row| row.id)
            .collect();

        info!(ids = ids.len(), "Dispatching property update");
        let result = self.backend.update_properties(&UpdateRequest { ids }).await;
        Ok(self.outcome(result, UPDATED_MESSAGE))
    }

    fn outcome(&self, result: Result<(), BackendError>, success: &str) -> ConfirmOutcome {
        match result {
            Ok(()) => {
                metrics::counter!("confirmations_dispatched").increment(1);
                ConfirmOutcome::Dispatched(self.notifier.success(success))
            }
            Err(err) => {
                warn!(error = %err, "Confirmation failed");
                metrics::counter!("confirmations_failed").increment(1);
                let detail = err.server_message().unwrap_or(GENERIC_FAILURE);
                ConfirmOutcome::Failed(self.notifier.error(detail))
            }
        }
    }
}

fn skip_reason(
    permissions: &ResolvedPermissions,
    status: Option<&BatchJobStatus>,
) -> Option<SkipReason> {
    if !permissions.can_write() {
        return Some(SkipReason::NoWritePermission);
    }
    if status.is_some_and(BatchJobStatus::is_processing) {
        return Some(SkipReason::JobProcessing);
    }
    None
}

fn ensure_processable(rows: &[CritiqueRow]) -> Result<(), ValidationError> {
    if rows.iter().all(CritiqueRow::is_blocking) {
        return Err(ValidationError::AllRowsBlocked);
    }
    Ok(())
}
