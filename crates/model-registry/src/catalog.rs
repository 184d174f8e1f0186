//! Model catalog: the declarative list of models read at startup.
//!
//! ```json
//! {
//!   "sentiment": {
//!     "adapter": "keyword",
//!     "path": "models/sentiment",
//!     "config": { "min_score": 0.1 },
//!     "description": "Lexicon-based sentiment",
//!     "Optimized_Threshold": 0.42
//!   }
//! }
//! ```
//!
//! Declaration order is kept; it is the order models are loaded and listed in.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::adapter::AdapterParams;
use crate::errors::{CatalogError, LoadError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub adapter: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: AdapterParams,
    /// Non-string values are rendered as JSON text rather than rejected.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    /// Informational only; reported by `/models` verbatim, never interpreted.
    #[serde(default, rename = "Optimized_Threshold")]
    pub optimized_threshold: Option<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// The two fields a model cannot load without.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub adapter: String,
    /// Absolute location of the model artifact.
    pub path: PathBuf,
}

impl ModelConfig {
    pub fn from_value(value: &Value) -> Result<Self, LoadError> {
        if !value.is_object() {
            return Err(LoadError::ModelConfigInvalid(
                "model entry must be a JSON object".to_string(),
            ));
        }
        Self::deserialize(value).map_err(|e| LoadError::ModelConfigInvalid(e.to_string()))
    }

    /// Check the required fields and resolve the artifact path against the
    /// working directory.
    pub fn spec(&self) -> Result<ModelSpec, LoadError> {
        let adapter = non_empty(self.adapter.as_deref());
        let path = non_empty(self.path.as_deref());
        let (adapter, path) = match (adapter, path) {
            (Some(a), Some(p)) => (a, p),
            _ => {
                return Err(LoadError::ModelConfigInvalid(
                    "Missing adapter or path configuration".to_string(),
                ))
            }
        };

        Ok(ModelSpec {
            adapter: adapter.to_string(),
            path: absolute_path(Path::new(path))?,
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn absolute_path(path: &Path) -> Result<PathBuf, LoadError> {
    std::path::absolute(path).map_err(|e| {
        LoadError::ModelConfigInvalid(format!("cannot resolve path {}: {}", path.display(), e))
    })
}

/// Declared models, in declaration order. Entries are kept raw so one
/// malformed model cannot stop the others from loading.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<(String, Value)>,
}

impl ModelCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the catalog file. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            warn!("Model configuration {} not found; starting with no models", path.display());
            return Ok(Self::empty());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::parse(&raw).map_err(|e| match e {
            ParseFailure::Json(source) => CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::NotAnObject => CatalogError::NotAnObject {
                path: path.to_path_buf(),
            },
        })?;

        info!("Read {} model declarations from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    fn parse(raw: &str) -> Result<Self, ParseFailure> {
        match serde_json::from_str::<Value>(raw).map_err(ParseFailure::Json)? {
            Value::Object(map) => Ok(Self {
                models: map.into_iter().collect(),
            }),
            _ => Err(ParseFailure::NotAnObject),
        }
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self {
            models: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.models.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

enum ParseFailure {
    Json(serde_json::Error),
    NotAnObject,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_model_config_full_entry() {
        let cfg = ModelConfig::from_value(&json!({
            "adapter": "keyword",
            "path": "models/sentiment",
            "config": {"min_score": 0.1},
            "description": "Sentiment",
            "Optimized_Threshold": 0.42
        }))
        .unwrap();

        assert_eq!(cfg.adapter.as_deref(), Some("keyword"));
        assert_eq!(cfg.description.as_deref(), Some("Sentiment"));
        assert_eq!(cfg.optimized_threshold, Some(json!(0.42)));
        assert_eq!(cfg.config.get("min_score"), Some(&json!(0.1)));
    }

    #[test]
    fn test_model_config_defaults() {
        let cfg = ModelConfig::from_value(&json!({"adapter": "echo", "path": "m"})).unwrap();
        assert!(cfg.config.is_empty());
        assert!(cfg.description.is_none());
        assert!(cfg.optimized_threshold.is_none());
    }

    #[test]
    fn test_null_config_is_empty() {
        let cfg = ModelConfig::from_value(&json!({"adapter": "echo", "path": "m", "config": null}))
            .unwrap();
        assert!(cfg.config.is_empty());
    }

    #[test]
    fn test_informational_fields_accept_any_type() {
        let cfg = ModelConfig::from_value(&json!({
            "adapter": "echo",
            "path": "m",
            "description": 7,
            "Optimized_Threshold": "0.85"
        }))
        .unwrap();
        assert_eq!(cfg.description.as_deref(), Some("7"));
        assert_eq!(cfg.optimized_threshold, Some(json!("0.85")));

        let cfg = ModelConfig::from_value(&json!({
            "adapter": "echo",
            "path": "m",
            "description": null,
            "Optimized_Threshold": null
        }))
        .unwrap();
        assert!(cfg.description.is_none());
        assert!(cfg.optimized_threshold.is_none());
    }

    #[test]
    fn test_mistyped_entry_is_invalid() {
        assert!(matches!(
            ModelConfig::from_value(&json!({"adapter": 3, "path": "m"})),
            Err(LoadError::ModelConfigInvalid(_))
        ));
        assert!(matches!(
            ModelConfig::from_value(&json!("echo")),
            Err(LoadError::ModelConfigInvalid(_))
        ));
    }

    #[test]
    fn test_spec_requires_adapter_and_path() {
        let no_adapter = ModelConfig::from_value(&json!({"path": "m"})).unwrap();
        let no_path = ModelConfig::from_value(&json!({"adapter": "echo"})).unwrap();
        let blank = ModelConfig::from_value(&json!({"adapter": " ", "path": "m"})).unwrap();

        for cfg in [no_adapter, no_path, blank] {
            assert!(matches!(cfg.spec(), Err(LoadError::ModelConfigInvalid(_))));
        }
    }

    #[test]
    fn test_spec_resolves_relative_path() {
        let cfg = ModelConfig::from_value(&json!({"adapter": "echo", "path": "models/dummy"}))
            .unwrap();
        let spec = cfg.spec().unwrap();

        assert!(spec.path.is_absolute());
        assert_eq!(spec.path, std::env::current_dir().unwrap().join("models/dummy"));
    }

    #[test]
    fn test_spec_keeps_absolute_path() {
        let cfg = ModelConfig::from_value(&json!({"adapter": "echo", "path": "/srv/models/a"}))
            .unwrap();
        assert_eq!(cfg.spec().unwrap().path, PathBuf::from("/srv/models/a"));
    }

    #[test]
    fn test_catalog_preserves_declaration_order() {
        let catalog = ModelCatalog::parse(
            r#"{"zeta": {}, "alpha": {}, "mid": {}}"#,
        )
        .ok()
        .unwrap();
        let names: Vec<&str> = catalog.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_missing_file_is_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ModelCatalog::load(&dir.path().join("models.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ModelCatalog::load(&path),
            Err(CatalogError::Parse { .. })
        ));

        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            ModelCatalog::load(&path),
            Err(CatalogError::NotAnObject { .. })
        ));
    }
}
