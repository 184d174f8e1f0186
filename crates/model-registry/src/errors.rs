//! Error types for model loading and dispatch.
//!
//! Load-time errors (`CatalogError`, `LoadError`, `SetupError`) stay inside
//! registry initialization; query-time errors (`RegistryError`,
//! `InferenceError`) travel to the HTTP layer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read model configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse model configuration {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("model configuration {} must be a JSON object keyed by model name", path.display())]
    NotAnObject { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("model artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("invalid adapter parameters: {0}")]
    InvalidParams(String),

    #[error("adapter already set up")]
    AlreadyInitialized,

    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("adapter is not set up")]
    NotReady,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Backend(String),
}

/// Why a declared model did not make it into the registry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid model configuration: {0}")]
    ModelConfigInvalid(String),

    #[error("adapter '{name}' not found: {reason}")]
    AdapterNotFound { name: String, reason: String },

    #[error("invalid adapter '{name}': {reason}")]
    InvalidAdapter { name: String, reason: String },

    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),
}

impl LoadError {
    /// Short stable label, used for metrics and the load report.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::ModelConfigInvalid(_) => "config_invalid",
            LoadError::AdapterNotFound { .. } => "adapter_not_found",
            LoadError::InvalidAdapter { .. } => "invalid_adapter",
            LoadError::Setup(_) => "setup_failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found_message_matches_http_body() {
        let err = RegistryError::ModelNotFound("unknown".to_string());
        assert_eq!(err.to_string(), "Model 'unknown' not found");
    }

    #[test]
    fn test_inference_error_passes_through_verbatim() {
        let err: RegistryError = InferenceError::Backend("CUDA out of memory".into()).into();
        assert_eq!(err.to_string(), "CUDA out of memory");
    }

    #[test]
    fn test_load_error_kinds() {
        let not_found = LoadError::AdapterNotFound {
            name: "x".into(),
            reason: "missing".into(),
        };
        assert_eq!(not_found.kind(), "adapter_not_found");
        assert_eq!(
            LoadError::from(SetupError::AlreadyInitialized).kind(),
            "setup_failed"
        );
    }
}
