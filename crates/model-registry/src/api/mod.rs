//! API module - HTTP handlers over the model registry

pub mod health_api;
pub mod inference_api;
pub mod models_api;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

pub use health_api::healthz;
pub use inference_api::run_inference;
pub use models_api::list_models;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}
