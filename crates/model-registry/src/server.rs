//! Server startup
//!
//! Loads every declared model once, then serves the registry over HTTP until
//! the process is interrupted. Models are never reloaded while running.

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    adapter::AdapterLoader, api, config::Config, device, metrics, registry::ModelRegistry,
    state::AppState,
};

/// Run the model server with `cfg` until ctrl-c.
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    if let Err(e) = metrics::init_metrics() {
        warn!("Metrics disabled: {}", e);
    }
    cfg.print_config();

    let device = device::probe(&cfg.device);
    info!("Using device: {}", device);

    let mut loader = AdapterLoader::new(&cfg.adapters_dir);
    info!(
        "Adapters: built-in [{}], directory {}",
        loader.registered().join(", "),
        loader.adapters_dir().display()
    );

    let registry = ModelRegistry::from_config_file(&cfg.models_config, &mut loader, &device).await?;
    if registry.is_empty() {
        warn!("No models loaded; every inference request will return 404");
    }

    let state = AppState::new(registry);
    let app = build_router(state, Duration::from_secs(cfg.request_timeout_seconds));

    let addr = cfg.bind_address();
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/models", get(api::list_models))
        .route("/inference/:model_name", post(api::run_inference))
        .route("/healthz", get(api::healthz))
        .route("/metrics", get(metrics::get_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
