use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::job::{BatchJobStatus, JobState};
use crate::models::notification::Notification;
use crate::models::table::TableQueryState;
use crate::models::workflow::TableId;
use crate::routes::error::{ApiError, CurrentUser};
use crate::routes::status::fresh_table_state;
use crate::routes::validation::csv_download;
use crate::services::csv_export::{processing_report, RESULTS_REPORT_FILE};
use crate::services::loading::LoadBarrier;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTable {
    pub table: TableQueryState,
    pub records: Vec<BatchJobStatus>,
    /// Rows across all pages, when paging happens here rather than in the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringScreen {
    /// Every batch run, including the one in progress.
    pub monitoring: Option<HistoryTable>,
    /// Finished batch runs only.
    pub results: Option<HistoryTable>,
    pub errors: Vec<Notification>,
}

/// GET /api/v1/ligacoes-esgoto/acompanhamento: both monitoring tables,
/// loaded together.
pub async fn load_screen(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<MonitoringScreen> {
    let monitoring_table = fresh_table_state(&state, &user.id, TableId::MONITORING).await;
    let results_table = fresh_table_state(&state, &user.id, TableId::RESULTS).await;

    let mut results = LoadBarrier::<HistoryTable, ApiError>::new("acompanhamento")
        .add("monitoramento", async {
            let records = state.poller.history(Some(&monitoring_table)).await?;
            Ok::<_, ApiError>(HistoryTable {
                table: monitoring_table.clone(),
                records,
                total: None,
            })
        })
        .add("resultados", async {
            // The backend cannot filter by status, so page over the finished runs here.
            let done = finished(state.poller.history(None).await?);
            Ok::<_, ApiError>(HistoryTable {
                table: results_table.clone(),
                total: Some(done.len()),
                records: page_of(done, &results_table),
            })
        })
        .wait()
        .await;

    let errors = results
        .failed()
        .map(|(_, err)| err.notification(&state.notifier))
        .collect();

    Json(MonitoringScreen {
        monitoring: results.take("monitoramento").and_then(Result::ok),
        results: results.take("resultados").and_then(Result::ok),
        errors,
    })
}

/// GET /api/v1/ligacoes-esgoto/resultados/csv: download the finished runs.
pub async fn export_results(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    let records = finished(state.poller.history(None).await?);
    let csv = processing_report(&user.id, chrono::Local::now().naive_local(), &records)?;

    metrics::counter!("csv_exports_total", "report" => "resultados").increment(1);
    Ok(csv_download(RESULTS_REPORT_FILE, csv))
}

fn page_of(records: Vec<BatchJobStatus>, table: &TableQueryState) -> Vec<BatchJobStatus> {
    let skip = usize::try_from(table.first_row()).unwrap_or(usize::MAX);
    records
        .into_iter()
        .skip(skip)
        .take(table.page_size as usize)
        .collect()
}

fn finished(records: Vec<BatchJobStatus>) -> Vec<BatchJobStatus> {
    records
        .into_iter()
        .filter(|record| record.status == JobState::Done)
        .collect()
}
