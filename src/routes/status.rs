use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::job::BatchJobStatus;
use crate::models::table::TableQueryState;
use crate::models::workflow::{NavigateRequest, TableId, WorkflowStep};
use crate::routes::error::{ApiError, CurrentUser};
use crate::services::table_state::load_table_state;
use crate::services::workflow::NavigationPolicy;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: BatchJobStatus,
    pub description: String,
    pub processing: bool,
    /// False when a newer status had already been applied to this session.
    pub applied: bool,
}

/// GET /api/v1/ligacoes-esgoto/status: poll the backend job status.
pub async fn get_status(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<StatusResponse>, ApiError> {
    let session = state.sessions.session(&user.id).await;
    let outcome = state.poller.poll_tracked(&session.tracker).await?;
    let status = outcome.snapshot.status;

    Ok(Json(StatusResponse {
        description: status.description(),
        processing: status.is_processing(),
        applied: outcome.applied,
        status,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub step: WorkflowStep,
    pub policy: NavigationPolicy,
}

/// GET /api/v1/ligacoes-esgoto/etapa: current wizard step.
pub async fn get_step(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<StepResponse> {
    let session = state.sessions.session(&user.id).await;
    let stepper = session.stepper.lock().await;
    Json(StepResponse {
        step: stepper.current(),
        policy: stepper.policy(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadedTable {
    pub table: &'static str,
    pub state: TableQueryState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResponse {
    pub from: WorkflowStep,
    pub to: WorkflowStep,
    pub tables: Vec<ReloadedTable>,
}

/// PUT /api/v1/ligacoes-esgoto/etapa: move the wizard to another step.
///
/// Each table of the target step comes back with its freshly loaded state.
pub async fn navigate(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>, ApiError> {
    let session = state.sessions.session(&user.id).await;
    let status = session.tracker.current().await;
    let change = session
        .stepper
        .lock()
        .await
        .navigate(request.step, status.as_ref())?;

    let mut tables = Vec::with_capacity(change.reload.len());
    for &table in change.reload {
        tables.push(ReloadedTable {
            table: table.suffix,
            state: fresh_table_state(&state, &user.id, table).await,
        });
    }

    Ok(Json(NavigateResponse {
        from: change.from,
        to: change.to,
        tables,
    }))
}

/// Stored table state, or defaults when the store is unavailable.
pub(crate) async fn fresh_table_state(state: &AppState, user: &str, table: TableId) -> TableQueryState {
    match load_table_state(state.table_store.as_ref(), user, table).await {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!(error = %e, table = table.suffix, "Table state unavailable, using defaults");
            TableQueryState::default()
        }
    }
}
