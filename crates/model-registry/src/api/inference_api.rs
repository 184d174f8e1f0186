// Inference dispatch: POST /inference/:model_name with {"text": "..."}
use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde_json::Value;
use tracing::{debug, warn};

use super::{api_error, ApiError};
use crate::errors::RegistryError;
use crate::metrics;
use crate::state::AppState;

const MISSING_TEXT: &str = "Missing 'text' field in request body";
const TEXT_NOT_STRING: &str = "'text' field must be a string";

/// Label used for requests naming a model that is not loaded, so arbitrary
/// path segments cannot grow the metric's label set.
const UNKNOWN_MODEL_LABEL: &str = "_unknown";

/// Pull the `text` field out of a raw request body.
fn extract_text(body: &[u8]) -> Result<String, &'static str> {
    let value: Value = serde_json::from_slice(body).map_err(|_| MISSING_TEXT)?;
    match value.get("text") {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) if value.is_object() => Err(TEXT_NOT_STRING),
        _ => Err(MISSING_TEXT),
    }
}

pub async fn run_inference(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // The model is checked before the body so an unknown name is always a 404.
    if !state.registry.contains(&model_name) {
        metrics::inc_request(UNKNOWN_MODEL_LABEL, StatusCode::NOT_FOUND.as_u16());
        return Err(api_error(
            StatusCode::NOT_FOUND,
            RegistryError::ModelNotFound(model_name).to_string(),
        ));
    }

    let text = extract_text(&body).map_err(|msg| {
        metrics::inc_request(&model_name, StatusCode::BAD_REQUEST.as_u16());
        api_error(StatusCode::BAD_REQUEST, msg)
    })?;

    debug!("Inference on '{}' ({} chars)", model_name, text.chars().count());

    match state.registry.run_inference(&model_name, &text).await {
        Ok(output) => {
            metrics::inc_request(&model_name, StatusCode::OK.as_u16());
            Ok(Json(Value::Object(output)))
        }
        Err(e @ RegistryError::ModelNotFound(_)) => {
            metrics::inc_request(UNKNOWN_MODEL_LABEL, StatusCode::NOT_FOUND.as_u16());
            Err(api_error(StatusCode::NOT_FOUND, e.to_string()))
        }
        Err(RegistryError::Inference(e)) => {
            warn!("Inference on '{}' failed: {}", model_name, e);
            metrics::inc_request(&model_name, StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
