pub mod error;
pub mod health;
pub mod metrics;
pub mod monitoring;
pub mod permissions;
pub mod status;
pub mod upload;
pub mod validation;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

/// Headroom for multipart framing on top of the batch size limit.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Largest request body accepted by the upload and confirmation routes.
///
/// Twice the batch limit, so an oversized selection reaches validation and is
/// reported as too large instead of being cut off by the transport.
pub fn upload_body_limit(max_batch_bytes: u64) -> usize {
    let limit = max_batch_bytes
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// API routes with notification rendering. `/metrics` is mounted by the binary.
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(upload_body_limit(state.submitter.max_batch_bytes()));

    let batch = Router::new()
        .route("/status", get(status::get_status))
        .route("/etapa", get(status::get_step).put(status::navigate))
        .route("/arquivos", post(upload::submit_batch).layer(body_limit))
        .route("/arquivos/resumo", post(upload::selection_summary))
        .route("/validacao", get(validation::load_screen))
        .route("/criticas", get(validation::query_critiques))
        .route("/criticas/csv", get(validation::export_critiques))
        .route("/confirmar", post(validation::confirm).layer(body_limit))
        .route(
            "/confirmar-selecionados",
            post(validation::confirm_selected).layer(body_limit),
        )
        .route("/acompanhamento", get(monitoring::load_screen))
        .route("/resultados/csv", get(monitoring::export_results));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/ligacoes-esgoto", batch)
        .route(
            "/api/v1/permissoes/{tela}",
            get(permissions::screen_permissions),
        )
        .layer(middleware::map_response_with_state(
            state.notifier,
            error::render_notifications,
        ))
        .with_state(state)
}
