//! Adapter contract
//!
//! The capability set every model backend exposes so the registry and the
//! router can treat a neural network, a rule engine or a remote proxy the same
//! way.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use crate::errors::{InferenceError, SetupError};

/// Result of one inference call: an arbitrary JSON object.
pub type InferenceOutput = Map<String, Value>;

/// Backend-specific parameters from the model's `config` block.
///
/// The registry never looks inside; each adapter turns it into its own typed
/// options with [`AdapterParams::parse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdapterParams(Map<String, Value>);

impl AdapterParams {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Deserialize into an adapter's options struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, SetupError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| SetupError::InvalidParams(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

impl From<Map<String, Value>> for AdapterParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Opaque execution-target hint ("cpu", "cuda", ...). Decided once per process
/// and handed unchanged to every adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Device(String);

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn cpu() -> Self {
        Self::new("cpu")
    }

    pub fn cuda() -> Self {
        Self::new("cuda")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_accelerator(&self) -> bool {
        self.0 != "cpu"
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::cpu()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterMetadata {
    pub adapter: String,
    pub version: String,
    /// Whether concurrent `inference` calls run in parallel or are serialized
    /// inside the adapter.
    pub reentrant: bool,
}

/// A model backend.
///
/// Instances start uninitialized; `setup` is called exactly once, after which
/// `inference` may be called concurrently from any number of requests.
/// Adapters that cannot run calls in parallel must serialize internally.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Load the artifact at `model_path` and make the backend ready.
    async fn setup(
        &mut self,
        model_path: &Path,
        params: &AdapterParams,
        device: &Device,
    ) -> Result<(), SetupError>;

    /// Run the model on `input`.
    async fn inference(&self, input: &str) -> Result<InferenceOutput, InferenceError>;

    fn metadata(&self) -> AdapterMetadata;
}
