//! Prometheus metrics, exported on `/metrics`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder,
};
use std::sync::OnceLock;
use tracing::error;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}

struct Metrics {
    requests: IntCounterVec,
    models_loaded: IntGauge,
    load_failures: IntCounterVec,
    inference_duration: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

fn build() -> prometheus::Result<Metrics> {
    Ok(Metrics {
        requests: IntCounterVec::new(
            prometheus::opts!("model_requests_total", "Inference requests per model"),
            &["model", "status"],
        )?,
        models_loaded: IntGauge::new("models_loaded", "Models available for inference")?,
        load_failures: IntCounterVec::new(
            prometheus::opts!(
                "model_load_failures_total",
                "Declared models skipped at startup"
            ),
            &["reason"],
        )?,
        inference_duration: HistogramVec::new(
            HistogramOpts::new(
                "inference_duration_seconds",
                "Time spent inside the model backend",
            ),
            &["model"],
        )?,
    })
}

/// Create and register the collectors. Safe to call more than once.
pub fn init_metrics() -> prometheus::Result<()> {
    if METRICS.get().is_some() {
        return Ok(());
    }
    if METRICS.set(build()?).is_err() {
        // Lost the race; the winner registers.
        return Ok(());
    }
    if let Some(m) = METRICS.get() {
        REGISTRY.register(Box::new(m.requests.clone()))?;
        REGISTRY.register(Box::new(m.models_loaded.clone()))?;
        REGISTRY.register(Box::new(m.load_failures.clone()))?;
        REGISTRY.register(Box::new(m.inference_duration.clone()))?;
    }
    Ok(())
}

pub fn inc_request(model: &str, status: u16) {
    if let Some(m) = METRICS.get() {
        let status = status.to_string();
        m.requests
            .with_label_values(&[model, status.as_str()])
            .inc();
    }
}

pub fn set_models_loaded(count: usize) {
    if let Some(m) = METRICS.get() {
        m.models_loaded.set(count as i64);
    }
}

pub fn inc_load_failure(reason: &str) {
    if let Some(m) = METRICS.get() {
        m.load_failures.with_label_values(&[reason]).inc();
    }
}

pub fn observe_inference(model: &str, seconds: f64) {
    if let Some(m) = METRICS.get() {
        m.inference_duration
            .with_label_values(&[model])
            .observe(seconds);
    }
}

/// Text exposition of everything registered so far.
pub fn render() -> prometheus::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

pub async fn get_metrics() -> impl IntoResponse {
    match render() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            buffer,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; version=0.0.4")],
                Vec::new(),
            )
        }
    }
}
