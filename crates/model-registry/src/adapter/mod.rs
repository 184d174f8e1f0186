//! Adapters
//!
//! Pluggable model backends behind one trait.
//!
//! Architecture:
//! - `contract` defines the `ModelAdapter` trait every backend implements
//! - `builtin` holds the adapters compiled into the server
//! - `plugin` wraps shared libraries exporting the C adapter ABI
//! - `loader` maps an adapter identifier to one of the above
pub mod builtin;
pub mod contract;
pub mod loader;
pub mod plugin;

pub use contract::{AdapterMetadata, AdapterParams, Device, InferenceOutput, ModelAdapter};
pub use loader::{AdapterFactory, AdapterLoader, AdapterSource};
pub use plugin::{PluginAdapter, PluginLibrary};
