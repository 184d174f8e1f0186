// Liveness and load summary
use axum::extract::{Json, State};
use serde::Serialize;
use sysinfo::System;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub device: String,
    pub models_loaded: usize,
    pub models_failed: usize,
    pub uptime_seconds: u64,
    pub memory_usage: String,
    pub version: &'static str,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let memory_usage = {
        let mut sys = System::new();
        sys.refresh_memory();
        format!(
            "{}/{} MB",
            sys.used_memory() / 1024 / 1024,
            sys.total_memory() / 1024 / 1024
        )
    };

    let report = state.registry.report();
    Json(HealthResponse {
        status: "ok",
        device: state.registry.device().to_string(),
        models_loaded: report.loaded(),
        models_failed: report.failed(),
        uptime_seconds: state.uptime_seconds(),
        memory_usage,
        version: env!("CARGO_PKG_VERSION"),
    })
}
