use serde::Serialize;

use crate::services::backend::BatchFile;

/// Upper bound for one upload batch: 30 MB, decimal.
pub const MAX_BATCH_BYTES: u64 = 30_000_000;

const BYTES_PER_MB: f64 = 1_000_000.0;

/// File count and aggregate size shown next to the upload form.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSummary {
    pub file_count: usize,
    pub total_bytes: u64,
    pub total_mb: f64,
}

impl SelectionSummary {
    pub fn from_sizes(sizes: impl IntoIterator<Item = u64>) -> Self {
        let (file_count, total_bytes) = sizes
            .into_iter()
            .fold((0usize, 0u64), |(count, total), size| {
                (count + 1, total.saturating_add(size))
            });

        Self {
            file_count,
            total_bytes,
            total_mb: total_bytes as f64 / BYTES_PER_MB,
        }
    }

    pub fn of_files(files: &[BatchFile]) -> Self {
        Self::from_sizes(files.iter().map(|file| file.size))
    }
}

/// Validate a file selection before anything is sent.
///
/// The empty check runs first, so an empty selection never reports `TooLarge`.
pub fn check_selection(
    summary: &SelectionSummary,
    limit: u64,
) -> Result<(), ValidationError> {
    if summary.file_count == 0 {
        return Err(ValidationError::EmptySelection);
    }
    if summary.total_bytes > limit {
        return Err(ValidationError::TooLarge {
            total_bytes: summary.total_bytes,
            limit,
        });
    }
    Ok(())
}

/// Local precondition failures, reported without calling the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Select at least one file to send")]
    EmptySelection,

    #[error("The selected files exceed {} MB", limit / 1_000_000)]
    TooLarge { total_bytes: u64, limit: u64 },

    #[error("Unable to proceed: every record has a critique")]
    AllRowsBlocked,

    #[error("Required field is missing: {0}")]
    MissingField(&'static str),
}
