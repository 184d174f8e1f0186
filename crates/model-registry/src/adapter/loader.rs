//! Adapter Loader
//!
//! Turns an adapter identifier from the model configuration into something
//! that can build backend instances. Identifiers are looked up first in the
//! compiled-in table, then as a shared library in the adapters directory
//! (`<dir>/libX.so`, `<dir>/libX.dylib` or `<dir>\X.dll`).
//!
//! Libraries from the adapters directory run with full process privilege.
//! There is no sandbox; only point `ADAPTERS_DIR` at code you trust.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::builtin::builtin_adapters;
use super::contract::ModelAdapter;
use super::plugin::PluginLibrary;
use crate::errors::LoadError;

/// Constructor for a compiled-in adapter.
pub type AdapterFactory = fn() -> Box<dyn ModelAdapter>;

/// A validated adapter implementation. Each `instantiate` call yields a new,
/// independent backend.
pub enum AdapterSource {
    Builtin { id: String, factory: AdapterFactory },
    Plugin(Arc<PluginLibrary>),
}

impl AdapterSource {
    pub fn id(&self) -> &str {
        match self {
            AdapterSource::Builtin { id, .. } => id,
            AdapterSource::Plugin(lib) => lib.id(),
        }
    }

    /// Where the implementation came from, for logs.
    pub fn origin(&self) -> String {
        match self {
            AdapterSource::Builtin { .. } => "builtin".to_string(),
            AdapterSource::Plugin(lib) => lib.path().display().to_string(),
        }
    }

    pub fn instantiate(&self) -> Result<Box<dyn ModelAdapter>, LoadError> {
        match self {
            AdapterSource::Builtin { factory, .. } => Ok(factory()),
            AdapterSource::Plugin(lib) => Ok(Box::new(lib.create_instance()?)),
        }
    }
}

impl fmt::Debug for AdapterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterSource")
            .field("id", &self.id())
            .field("origin", &self.origin())
            .finish()
    }
}

pub struct AdapterLoader {
    adapters_dir: PathBuf,
    factories: HashMap<String, AdapterFactory>,
    resolved: HashMap<String, Arc<AdapterSource>>,
}

impl AdapterLoader {
    /// Loader with the built-in adapters registered.
    pub fn new(adapters_dir: impl Into<PathBuf>) -> Self {
        let mut loader = Self::without_builtins(adapters_dir);
        for (id, factory) in builtin_adapters() {
            loader.register(id, factory);
        }
        loader
    }

    pub fn without_builtins(adapters_dir: impl Into<PathBuf>) -> Self {
        Self {
            adapters_dir: adapters_dir.into(),
            factories: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    /// Add (or replace) a compiled-in adapter.
    pub fn register(&mut self, id: impl Into<String>, factory: AdapterFactory) -> &mut Self {
        let id = id.into();
        self.resolved.remove(&id);
        self.factories.insert(id, factory);
        self
    }

    pub fn adapters_dir(&self) -> &Path {
        &self.adapters_dir
    }

    pub fn registered(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Conventional location of the library for `id`.
    pub fn library_path(&self, id: &str) -> PathBuf {
        self.adapters_dir.join(libloading::library_filename(id))
    }

    /// Resolve `id` to its implementation, validating it on first use.
    ///
    /// Successful resolutions are cached, so later lookups of the same id
    /// return the same source without touching the filesystem.
    pub fn resolve(&mut self, id: &str) -> Result<Arc<AdapterSource>, LoadError> {
        if let Some(source) = self.resolved.get(id) {
            debug!("Adapter '{}' resolved from cache", id);
            return Ok(Arc::clone(source));
        }

        validate_identifier(id)?;

        let source = if let Some(factory) = self.factories.get(id) {
            AdapterSource::Builtin {
                id: id.to_string(),
                factory: *factory,
            }
        } else {
            let path = self.library_path(id);
            if !path.is_file() {
                return Err(LoadError::AdapterNotFound {
                    name: id.to_string(),
                    reason: format!("no built-in adapter and no library at {}", path.display()),
                });
            }
            AdapterSource::Plugin(Arc::new(PluginLibrary::open(id, &path)?))
        };

        info!("Resolved adapter '{}' ({})", id, source.origin());
        let source = Arc::new(source);
        self.resolved.insert(id.to_string(), Arc::clone(&source));
        Ok(source)
    }
}

/// Identifiers are bare names; anything that could walk out of the adapters
/// directory is rejected.
fn validate_identifier(id: &str) -> Result<(), LoadError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(LoadError::AdapterNotFound {
            name: id.to_string(),
            reason: "adapter identifiers may only contain letters, digits, '_' and '-'"
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::builtin::EchoAdapter;
    use std::fs;

    fn echo() -> Box<dyn ModelAdapter> {
        Box::new(EchoAdapter::new())
    }

    #[test]
    fn test_builtins_are_registered() {
        let loader = AdapterLoader::new("adapters");
        assert_eq!(loader.registered(), vec!["echo", "http_proxy", "keyword"]);
    }

    #[test]
    fn test_resolves_builtin() {
        let mut loader = AdapterLoader::new("adapters");
        let source = loader.resolve("echo").unwrap();
        assert_eq!(source.id(), "echo");
        assert_eq!(source.origin(), "builtin");
    }

    #[test]
    fn test_resolution_is_cached_and_stable() {
        let mut loader = AdapterLoader::new("adapters");
        let first = loader.resolve("keyword").unwrap();
        let second = loader.resolve("keyword").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_instances_are_independent() {
        let mut loader = AdapterLoader::without_builtins("adapters");
        loader.register("dummy", echo);
        let source = loader.resolve("dummy").unwrap();

        let a = source.instantiate().unwrap();
        let b = source.instantiate().unwrap();
        let pa = a.as_ref() as *const dyn ModelAdapter as *const u8;
        let pb = b.as_ref() as *const dyn ModelAdapter as *const u8;
        assert_ne!(pa, pb);
    }

    #[test]
    fn test_unknown_identifier_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = AdapterLoader::new(dir.path());

        match loader.resolve("missing_adapter") {
            Err(LoadError::AdapterNotFound { name, reason }) => {
                assert_eq!(name, "missing_adapter");
                assert!(reason.contains(&dir.path().display().to_string()));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_path_like_identifiers_are_rejected() {
        let mut loader = AdapterLoader::new("adapters");
        for id in ["", "../evil", "a/b", "a\\b", "x.so"] {
            assert!(
                matches!(loader.resolve(id), Err(LoadError::AdapterNotFound { .. })),
                "identifier {:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_library_without_entry_point_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = AdapterLoader::without_builtins(dir.path());
        fs::write(loader.library_path("bogus"), b"\x7fELF but not really").unwrap();

        assert!(matches!(
            loader.resolve("bogus"),
            Err(LoadError::InvalidAdapter { .. })
        ));
        // Failures are not cached: a second attempt re-validates.
        assert!(matches!(
            loader.resolve("bogus"),
            Err(LoadError::InvalidAdapter { .. })
        ));
    }

    #[test]
    fn test_builtin_shadows_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = AdapterLoader::new(dir.path());
        fs::write(loader.library_path("echo"), b"garbage").unwrap();

        let source = loader.resolve("echo").unwrap();
        assert_eq!(source.origin(), "builtin");
    }

    #[test]
    fn test_library_path_follows_platform_convention() {
        let loader = AdapterLoader::new("/opt/adapters");
        let path = loader.library_path("dummy");
        let file = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file.contains("dummy"));
        assert!(path.starts_with("/opt/adapters"));
    }
}
