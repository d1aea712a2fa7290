use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::models::critique::{blocked_count, CritiqueRow};
use crate::models::job::{BatchJobStatus, BatchSnapshot};
use crate::models::notification::Notification;
use crate::models::table::{TableQuery, TableQueryState};
use crate::models::workflow::TableId;
use crate::routes::error::{ApiError, CurrentUser, NotificationBody};
use crate::routes::status::fresh_table_state;
use crate::services::csv_export::{critique_report, CRITIQUE_REPORT_FILE};
use crate::services::dispatcher::ConfirmOutcome;
use crate::services::loading::LoadBarrier;
use crate::services::permissions::{resolve_permissions, ResolvedPermissions, VALIDATION_SCREEN};
use crate::services::sessions::UserSession;
use crate::services::table_state::persist_table_state;

/// Page size used to export the whole critique table at once.
const EXPORT_PAGE_SIZE: u32 = 10_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CritiquePage {
    pub table: TableQueryState,
    pub rows: Vec<CritiqueRow>,
    pub blocked_count: usize,
}

enum ValidationPart {
    Status(BatchSnapshot),
    Critiques(Vec<CritiqueRow>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationScreen {
    pub status: Option<BatchJobStatus>,
    pub description: Option<String>,
    pub critiques: Option<CritiquePage>,
    pub permissions: ResolvedPermissions,
    /// Confirmation is offered only when nothing blocks it.
    pub can_confirm: bool,
    /// One entry per request that failed while loading the screen.
    pub errors: Vec<Notification>,
}

/// GET /api/v1/ligacoes-esgoto/validacao: everything the validation step
/// shows on mount, loaded together.
pub async fn load_screen(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<ValidationScreen> {
    let session = state.sessions.session(&user.id).await;
    let table = fresh_table_state(&state, &user.id, TableId::CRITIQUES).await;

    let mut results = LoadBarrier::<ValidationPart, ApiError>::new("validacao")
        .add("status", async {
            let outcome = state.poller.poll_tracked(&session.tracker).await?;
            Ok::<_, ApiError>(ValidationPart::Status(outcome.snapshot))
        })
        .add("criticas", async {
            let envelope = state.backend.fetch_status_page(&table).await?;
            Ok::<_, ApiError>(ValidationPart::Critiques(envelope.rows.unwrap_or_default()))
        })
        .wait()
        .await;

    let errors = results
        .failed()
        .map(|(_, err)| err.notification(&state.notifier))
        .collect();

    let status = match results.take("status") {
        Some(Ok(ValidationPart::Status(snapshot))) => Some(snapshot.status),
        _ => session.tracker.current().await,
    };
    let critiques = match results.take("criticas") {
        Some(Ok(ValidationPart::Critiques(rows))) => Some(CritiquePage {
            blocked_count: blocked_count(&rows),
            table: table.clone(),
            rows,
        }),
        _ => None,
    };

    let permissions = resolve_permissions(&VALIDATION_SCREEN, &user.grants);
    let can_confirm = permissions.can_write()
        && status.as_ref().is_some_and(|s| !s.is_processing())
        && critiques
            .as_ref()
            .is_some_and(|page| page.rows.iter().any(|row| !row.is_blocking()));

    Json(ValidationScreen {
        description: status.as_ref().map(BatchJobStatus::description),
        status,
        critiques,
        permissions,
        can_confirm,
        errors,
    })
}

/// GET /api/v1/ligacoes-esgoto/criticas: sort or page the critique table.
pub async fn query_critiques(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<TableQuery>,
) -> Result<Json<CritiquePage>, ApiError> {
    query
        .validate()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let mut table = fresh_table_state(&state, &user.id, TableId::CRITIQUES).await;
    table.apply(&query);
    if let Err(e) = persist_table_state(state.table_store.as_ref(), &user.id, TableId::CRITIQUES, &table).await {
        tracing::warn!(error = %e, "Could not persist critique table state");
    }

    let rows = state
        .backend
        .fetch_status_page(&table)
        .await?
        .rows
        .unwrap_or_default();

    Ok(Json(CritiquePage {
        blocked_count: blocked_count(&rows),
        table,
        rows,
    }))
}

/// GET /api/v1/ligacoes-esgoto/criticas/csv: download the critique table.
pub async fn export_critiques(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    let mut table = fresh_table_state(&state, &user.id, TableId::CRITIQUES).await;
    table.page = 0;
    table.page_size = EXPORT_PAGE_SIZE;

    let rows = state
        .backend
        .fetch_status_page(&table)
        .await?
        .rows
        .unwrap_or_default();
    let csv = critique_report(&user.id, chrono::Local::now().naive_local(), &rows)?;

    metrics::counter!("csv_exports_total", "report" => "criticas").increment(1);
    Ok(csv_download(CRITIQUE_REPORT_FILE, csv))
}

pub(crate) fn csv_download(file_name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Rows to confirm. When absent, the rows of the latest status are used.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ConfirmRequest {
    #[garde(length(max = 100_000))]
    #[serde(default)]
    pub rows: Option<Vec<CritiqueRow>>,
}

/// POST /api/v1/ligacoes-esgoto/confirmar: send the batch for processing.
pub async fn confirm(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Option<Json<ConfirmRequest>>,
) -> Result<Response, ApiError> {
    let (permissions, status, rows) = prepare_confirmation(&state, &user, body).await?;
    let outcome = state
        .dispatcher
        .confirm(&permissions, status.as_ref(), rows)
        .await?;
    Ok(confirm_response(outcome))
}

/// POST /api/v1/ligacoes-esgoto/confirmar-selecionados: update only the
/// properties whose rows have no critique.
pub async fn confirm_selected(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Option<Json<ConfirmRequest>>,
) -> Result<Response, ApiError> {
    let (permissions, status, rows) = prepare_confirmation(&state, &user, body).await?;
    let outcome = state
        .dispatcher
        .confirm_selected(&permissions, status.as_ref(), &rows)
        .await?;
    Ok(confirm_response(outcome))
}

/// Resolve permissions, refresh the session status and pick the rows.
///
/// Without caller rows the latest status response is the only row source, so
/// a failed refresh is reported as is. With caller rows a failed refresh falls
/// back to the last status the session applied.
async fn prepare_confirmation(
    state: &AppState,
    user: &CurrentUser,
    body: Option<Json<ConfirmRequest>>,
) -> Result<(ResolvedPermissions, Option<BatchJobStatus>, Vec<CritiqueRow>), ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    request
        .validate()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let permissions = resolve_permissions(&VALIDATION_SCREEN, &user.grants);
    let session = state.sessions.session(&user.id).await;

    let (status, rows) = match request.rows {
        Some(rows) => (refresh_status(state, &session).await, rows),
        // Skipped by the dispatcher anyway; no need to reach the backend.
        None if !permissions.can_write() => (session.tracker.current().await, Vec::new()),
        None => {
            let outcome = state.poller.poll_tracked(&session.tracker).await?;
            let status = if outcome.applied {
                Some(outcome.snapshot.status)
            } else {
                session.tracker.current().await
            };
            (status, outcome.snapshot.rows)
        }
    };
    Ok((permissions, status, rows))
}

async fn refresh_status(state: &AppState, session: &UserSession) -> Option<BatchJobStatus> {
    match state.poller.poll_tracked(&session.tracker).await {
        Ok(outcome) if outcome.applied => Some(outcome.snapshot.status),
        Ok(_) => session.tracker.current().await,
        Err(e) => {
            tracing::warn!(error = %e, "Status refresh failed, using last known status");
            session.tracker.current().await
        }
    }
}

fn confirm_response(outcome: ConfirmOutcome) -> Response {
    match outcome {
        ConfirmOutcome::Skipped(reason) => {
            tracing::info!(reason = ?reason, "Confirmation skipped");
            StatusCode::NO_CONTENT.into_response()
        }
        ConfirmOutcome::Dispatched(notification) => {
            (StatusCode::OK, Json(NotificationBody { notification })).into_response()
        }
        ConfirmOutcome::Failed(notification) => {
            (StatusCode::BAD_GATEWAY, Json(NotificationBody { notification })).into_response()
        }
    }
}
