use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::services::backend::{BackendClient, BackendError, BatchFile, UploadReceipt};
use crate::services::validation::{check_selection, SelectionSummary, ValidationError};

/// Result of a submit attempt that reached a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted {
        batch_id: Uuid,
        receipt: UploadReceipt,
        summary: SelectionSummary,
    },
    Rejected(ValidationError),
}

/// Validates a file selection and uploads it to the backend.
///
/// Polling is left to the caller once a batch is accepted.
pub struct BatchSubmitter {
    backend: Arc<BackendClient>,
    max_batch_bytes: u64,
}

impl BatchSubmitter {
    pub fn new(backend: Arc<BackendClient>, max_batch_bytes: u64) -> Self {
        Self {
            backend,
            max_batch_bytes,
        }
    }

    pub fn max_batch_bytes(&self) -> u64 {
        self.max_batch_bytes
    }

    /// Check a selection without uploading it.
    pub fn validate(&self, files: &[BatchFile]) -> Result<SelectionSummary, ValidationError> {
        let summary = SelectionSummary::of_files(files);
        check_selection(&summary, self.max_batch_bytes)?;
        Ok(summary)
    }

    pub async fn submit(&self, files: Vec<BatchFile>) -> Result<SubmitOutcome, BackendError> {
        let summary = match self.validate(&files) {
            Ok(summary) => summary,
            Err(reason) => {
                warn!(reason = %reason, "Batch rejected before upload");
                metrics::counter!("batch_uploads_rejected").increment(1);
                return Ok(SubmitOutcome::Rejected(reason));
            }
        };

        let batch_id = Uuid::new_v4();
        info!(
            batch_id = %batch_id,
            file_count = summary.file_count,
            total_mb = summary.total_mb,
            "Uploading batch"
        );

        let receipt = self.backend.upload_batch(files).await?;
        metrics::counter!("batch_uploads_total").increment(1);

        info!(batch_id = %batch_id, upload_id = ?receipt.upload_id, "Batch accepted by backend");

        Ok(SubmitOutcome::Accepted {
            batch_id,
            receipt,
            summary,
        })
    }
}
