use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus scrape endpoint in text exposition format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

/// Register descriptions for every metric the service records.
pub fn describe_metrics() {
    metrics::describe_counter!("status_polls_total", "Backend status polls completed");
    metrics::describe_counter!(
        "stale_status_responses_discarded",
        "Status responses dropped because a newer one was already applied"
    );
    metrics::describe_counter!("batch_uploads_total", "Batches accepted by the backend");
    metrics::describe_counter!(
        "batch_uploads_rejected",
        "Batches rejected before upload (empty or too large)"
    );
    metrics::describe_counter!("confirmations_dispatched", "Confirmations accepted by the backend");
    metrics::describe_counter!("confirmations_failed", "Confirmations refused or not delivered");
    metrics::describe_counter!("csv_exports_total", "CSV reports generated");
    metrics::describe_histogram!(
        "screen_load_seconds",
        "Time until every request of a screen load settled"
    );
    metrics::describe_gauge!("active_sessions", "User sessions held by this process");
}
