use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sewer_batch_import::{
    app_state::AppState,
    config::AppConfig,
    routes::{self, metrics::describe_metrics, upload_body_limit},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing sewer-batch-import server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    describe_metrics();

    // Initialize backend client, table state store and sessions
    tracing::info!(
        backend = %config.backend_base_url,
        navigation = ?config.step_navigation,
        max_batch_bytes = config.max_batch_bytes,
        "Connecting services"
    );
    let state = AppState::from_config(&config).expect("Failed to initialize services");

    // Drop idle workflow sessions in the background
    let sessions = Arc::clone(&state.sessions);
    let sweep_every = Duration::from_secs(config.session_idle_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            let evicted = sessions.evict_idle().await;
            if evicted > 0 {
                tracing::info!(evicted, "Evicted idle sessions");
            }
        }
    });

    // Build API routes
    let app = routes::router(state)
        // Prometheus metrics endpoint (separate state)
        .merge(
            Router::new().route(
                "/metrics",
                get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
            ),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(upload_body_limit(config.max_batch_bytes)));

    tracing::info!("Starting sewer-batch-import on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
