//! Model Registry
//!
//! Owns one initialized adapter per successfully loaded model and dispatches
//! inference by model name. Built once at startup, then read-only: there is
//! no API to add or remove models after `initialize` returns, so the registry
//! is shared behind an `Arc` without locks.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::adapter::{AdapterLoader, Device, InferenceOutput, ModelAdapter};
use crate::catalog::{ModelCatalog, ModelConfig};
use crate::errors::{CatalogError, LoadError, RegistryError};
use crate::metrics;

/// A loaded model: its configuration and its ready backend.
pub struct RegistryEntry {
    name: String,
    config: ModelConfig,
    model_path: PathBuf,
    adapter: Box<dyn ModelAdapter>,
    origin: String,
}

impl RegistryEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Absolute artifact path handed to `setup`.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn adapter(&self) -> &dyn ModelAdapter {
        self.adapter.as_ref()
    }

    /// "builtin" or the library path the adapter was loaded from.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// What happened to one declared model at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded { adapter: String },
    Skipped { kind: String, reason: String },
}

/// Load outcome of every declared model, in declaration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    outcomes: Vec<(String, LoadOutcome)>,
}

impl LoadReport {
    pub fn outcomes(&self) -> &[(String, LoadOutcome)] {
        &self.outcomes
    }

    pub fn outcome(&self, name: &str) -> Option<&LoadOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn loaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, LoadOutcome::Loaded { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.loaded()
    }
}

/// Listing view of a loaded model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub description: Option<String>,
    pub optimized_threshold: Option<serde_json::Value>,
}

pub struct ModelRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
    report: LoadReport,
    device: Device,
}

impl ModelRegistry {
    pub fn empty(device: Device) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            report: LoadReport::default(),
            device,
        }
    }

    /// Read the catalog at `path` and load every model it declares.
    pub async fn from_config_file(
        path: &Path,
        loader: &mut AdapterLoader,
        device: &Device,
    ) -> Result<Self, CatalogError> {
        let catalog = ModelCatalog::load(path)?;
        Ok(Self::initialize(&catalog, loader, device).await)
    }

    /// Load each declared model in order. A model that fails at any step is
    /// logged, recorded in the load report and left out; the rest still load.
    pub async fn initialize(
        catalog: &ModelCatalog,
        loader: &mut AdapterLoader,
        device: &Device,
    ) -> Self {
        info!(
            "Initializing {} declared model(s) on device '{}'",
            catalog.len(),
            device
        );

        let mut registry = Self::empty(device.clone());

        for (name, raw) in catalog.iter() {
            if registry.report.outcome(name).is_some() {
                warn!("Model '{}' declared twice; keeping the first", name);
                continue;
            }

            match load_model(name, raw, loader, device).await {
                Ok(entry) => {
                    info!(
                        "✅ Model '{}' loaded with adapter '{}' ({})",
                        name,
                        entry.adapter.metadata().adapter,
                        entry.origin
                    );
                    registry.report.outcomes.push((
                        name.to_string(),
                        LoadOutcome::Loaded {
                            adapter: entry.config.adapter.clone().unwrap_or_default(),
                        },
                    ));
                    registry.index.insert(name.to_string(), registry.entries.len());
                    registry.entries.push(entry);
                }
                Err(e) => {
                    error!("Failed to load model '{}': {}", name, e);
                    metrics::inc_load_failure(e.kind());
                    registry.report.outcomes.push((
                        name.to_string(),
                        LoadOutcome::Skipped {
                            kind: e.kind().to_string(),
                            reason: e.to_string(),
                        },
                    ));
                }
            }
        }

        metrics::set_models_loaded(registry.len());
        info!(
            "Model registry ready: {} loaded, {} skipped",
            registry.report.loaded(),
            registry.report.failed()
        );
        registry
    }

    /// Loaded models in declaration order.
    pub fn list(&self) -> Vec<ModelSummary> {
        self.entries
            .iter()
            .map(|e| ModelSummary {
                name: e.name.clone(),
                description: e.config.description.clone(),
                optimized_threshold: e.config.optimized_threshold.clone(),
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Run `input` through the named model. Backend errors are returned as-is.
    pub async fn run_inference(
        &self,
        name: &str,
        input: &str,
    ) -> Result<InferenceOutput, RegistryError> {
        let entry = self
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;

        let started = Instant::now();
        let result = entry.adapter.inference(input).await;
        let elapsed = started.elapsed();
        metrics::observe_inference(name, elapsed.as_secs_f64());
        debug!("Inference on '{}' took {:?}", name, elapsed);

        Ok(result?)
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

async fn load_model(
    name: &str,
    raw: &serde_json::Value,
    loader: &mut AdapterLoader,
    device: &Device,
) -> Result<RegistryEntry, LoadError> {
    let config = ModelConfig::from_value(raw)?;
    let spec = config.spec()?;

    let source = loader.resolve(&spec.adapter)?;
    let mut adapter = source.instantiate()?;

    debug!(
        "Setting up model '{}' from {}",
        name,
        spec.path.display()
    );
    adapter.setup(&spec.path, &config.config, device).await?;

    Ok(RegistryEntry {
        name: name.to_string(),
        origin: source.origin(),
        model_path: spec.path,
        adapter,
        config,
    })
}
