use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::notification::Notification;
use crate::routes::error::{ApiError, CurrentUser};
use crate::services::backend::BatchFile;
use crate::services::permissions::{resolve_permissions, IMPORT_SCREEN};
use crate::services::submitter::SubmitOutcome;
use crate::services::validation::{check_selection, SelectionSummary};

const FILE_FIELD: &str = "files";
const UNNAMED_FILE: &str = "arquivo";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub batch_id: Uuid,
    pub upload_id: Option<String>,
    pub summary: SelectionSummary,
    pub notification: Notification,
}

/// POST /api/v1/ligacoes-esgoto/arquivos: validate and upload a batch.
///
/// A user without write access gets `204` and nothing is sent.
pub async fn submit_batch(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let permissions = resolve_permissions(&IMPORT_SCREEN, &user.grants);
    if !permissions.can_write() {
        tracing::info!(user = %user.id, "Upload ignored, user has no write access");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNNAMED_FILE)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        files.push(BatchFile::from_bytes(name, bytes.to_vec()));
    }

    match state.submitter.submit(files).await? {
        SubmitOutcome::Accepted {
            batch_id,
            receipt,
            summary,
        } => {
            let notification = state.notifier.success(format!(
                "{} file(s) sent ({} MB). Processing has started.",
                summary.file_count, summary.total_mb
            ));
            let body = UploadResponse {
                batch_id,
                upload_id: receipt.upload_id,
                summary,
                notification,
            };
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
        SubmitOutcome::Rejected(reason) => Err(reason.into()),
    }
}

/// Sizes of the files currently selected in the upload form.
#[derive(Debug, Deserialize, Validate)]
pub struct SelectionRequest {
    #[garde(length(max = 1000))]
    pub sizes: Vec<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    #[serde(flatten)]
    pub summary: SelectionSummary,
    pub limit_bytes: u64,
    /// Why the selection cannot be sent, if it cannot.
    pub problem: Option<String>,
}

/// POST /api/v1/ligacoes-esgoto/arquivos/resumo: count and size of a selection.
pub async fn selection_summary(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<SelectionResponse>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let limit = state.submitter.max_batch_bytes();
    let summary = SelectionSummary::from_sizes(request.sizes);
    let problem = check_selection(&summary, limit).err().map(|e| e.to_string());

    Ok(Json(SelectionResponse {
        summary,
        limit_bytes: limit,
        problem,
    }))
}
