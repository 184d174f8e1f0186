// model-registry/src/lib.rs

pub mod adapter;
pub mod api;
pub mod catalog;
pub mod config;
pub mod device;
pub mod errors;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod state;
pub mod telemetry;

// Public API exports
pub use adapter::{
    AdapterFactory, AdapterLoader, AdapterMetadata, AdapterParams, Device, InferenceOutput,
    ModelAdapter,
};
pub use catalog::{ModelCatalog, ModelConfig};
pub use config::Config;
pub use errors::{CatalogError, InferenceError, LoadError, RegistryError, SetupError};
pub use registry::{LoadOutcome, LoadReport, ModelRegistry, ModelSummary, RegistryEntry};
pub use server::{build_router, run_server};
pub use state::AppState;
