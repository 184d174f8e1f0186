// Model listing: loaded models only, in declaration order
use axum::extract::{Json, State};
use serde_json::{json, Map, Value};

use crate::state::AppState;

const NO_DESCRIPTION: &str = "No description";

/// `GET /models` → `{name: {description, optimized_threshold}}`
pub async fn list_models(State(state): State<AppState>) -> Json<Value> {
    let mut models = Map::new();
    for summary in state.registry.list() {
        models.insert(
            summary.name,
            json!({
                "description": summary.description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                "optimized_threshold": summary.optimized_threshold,
            }),
        );
    }
    Json(Value::Object(models))
}
