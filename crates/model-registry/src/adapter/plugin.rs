//! Adapters loaded from shared libraries in the adapters directory.
//!
//! A library is opened once per adapter identifier and kept alive for the rest
//! of the process; every model using it gets its own backend handle.

use adapter_abi::{
    AdapterApi, AdapterEntryFn, AdapterString, ADAPTER_ABI_VERSION, ADAPTER_ENTRY_SYMBOL, ERR_OK,
};
use async_trait::async_trait;
use core::ffi::c_void;
use libloading::Library;
use serde_json::Value;
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::contract::*;
use crate::errors::{InferenceError, LoadError, SetupError};

pub struct PluginLibrary {
    id: String,
    semver: String,
    path: PathBuf,
    api: &'static AdapterApi,
    _lib: Library,
}

impl PluginLibrary {
    /// Load the library at `path` and validate its entry point.
    ///
    /// Loading runs the library's initializers and later calls its code with
    /// full process privilege. Nothing is sandboxed: whoever controls the
    /// adapters directory controls the process.
    pub fn open(id: &str, path: &Path) -> Result<Self, LoadError> {
        let invalid = |reason: String| LoadError::InvalidAdapter {
            name: id.to_string(),
            reason,
        };

        // SAFETY: trusting the adapters directory is the operator's decision.
        let lib = unsafe { Library::new(path) }
            .map_err(|e| invalid(format!("failed to load {}: {}", path.display(), e)))?;

        let entry: AdapterEntryFn = unsafe {
            let sym = lib
                .get::<AdapterEntryFn>(ADAPTER_ENTRY_SYMBOL.as_bytes())
                .map_err(|e| invalid(format!("missing symbol {}: {}", ADAPTER_ENTRY_SYMBOL, e)))?;
            *sym
        };

        let api_ptr = unsafe { entry() };
        if api_ptr.is_null() {
            return Err(invalid("adapter entry returned null".to_string()));
        }

        // SAFETY: the entry contract is a pointer to a static table that lives
        // as long as the library, which we keep in `_lib`.
        let api: &'static AdapterApi = unsafe { &*api_ptr };
        if api.info.abi_version != ADAPTER_ABI_VERSION {
            return Err(invalid(format!(
                "ABI mismatch: host={} adapter={}",
                ADAPTER_ABI_VERSION, api.info.abi_version
            )));
        }

        let semver = unsafe { static_str(api.info.semver) }.unwrap_or_else(|| "unknown".into());
        if let Some(reported) = unsafe { static_str(api.info.id) } {
            if reported != id {
                debug!("Adapter library {} reports id '{}'", path.display(), reported);
            }
        }

        info!("Loaded adapter '{}' v{} from {}", id, semver, path.display());

        Ok(Self {
            id: id.to_string(),
            semver,
            path: path.to_path_buf(),
            api,
            _lib: lib,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn semver(&self) -> &str {
        &self.semver
    }

    /// Create a fresh, not yet set up backend instance.
    pub fn create_instance(self: &Arc<Self>) -> Result<PluginAdapter, LoadError> {
        let handle = unsafe { (self.api.create)() };
        if handle.is_null() {
            let msg = self.last_error();
            return Err(LoadError::InvalidAdapter {
                name: self.id.clone(),
                reason: if msg.is_empty() {
                    "create returned null".to_string()
                } else {
                    msg
                },
            });
        }

        Ok(PluginAdapter {
            library: Arc::clone(self),
            handle: Mutex::new(PluginHandle(handle)),
            ready: false,
        })
    }

    /// Copy a string returned by the adapter and hand the buffer back to it.
    fn take_string(&self, s: AdapterString) -> String {
        if s.is_null() {
            return String::new();
        }
        let out = unsafe { CStr::from_ptr(s.ptr) }
            .to_string_lossy()
            .into_owned();
        unsafe { (self.api.free_string)(s) };
        out
    }

    fn last_error(&self) -> String {
        let s = unsafe { (self.api.last_error)() };
        self.take_string(s)
    }

    fn error_or(&self, fallback: &str) -> String {
        let msg = self.last_error();
        if msg.is_empty() {
            fallback.to_string()
        } else {
            msg
        }
    }
}

unsafe fn static_str(p: *const core::ffi::c_char) -> Option<String> {
    if p.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
}

struct PluginHandle(*mut c_void);

// SAFETY: the raw handle is only dereferenced by the adapter while the owning
// mutex is held.
unsafe impl Send for PluginHandle {}

/// Backend instance living inside a plugin library.
///
/// Foreign code is not assumed to be reentrant, so calls on one instance are
/// serialized. Different models never share an instance.
pub struct PluginAdapter {
    library: Arc<PluginLibrary>,
    handle: Mutex<PluginHandle>,
    ready: bool,
}

fn c_string(s: &str, what: &str) -> Result<CString, String> {
    CString::new(s).map_err(|_| format!("{} contains interior NUL", what))
}

#[async_trait]
impl ModelAdapter for PluginAdapter {
    async fn setup(
        &mut self,
        model_path: &Path,
        params: &AdapterParams,
        device: &Device,
    ) -> Result<(), SetupError> {
        if self.ready {
            return Err(SetupError::AlreadyInitialized);
        }

        let path = model_path
            .to_str()
            .ok_or_else(|| SetupError::Backend("model path not valid UTF-8".to_string()))?;
        let cpath = c_string(path, "model path").map_err(SetupError::Backend)?;
        let cparams = c_string(&params.to_json(), "params").map_err(SetupError::InvalidParams)?;
        let cdevice = c_string(device.as_str(), "device").map_err(SetupError::Backend)?;

        let handle = self.handle.get_mut().unwrap_or_else(|p| p.into_inner());
        let rc = unsafe {
            (self.library.api.setup)(
                handle.0,
                cpath.as_ptr(),
                cparams.as_ptr(),
                cdevice.as_ptr(),
            )
        };
        if rc != ERR_OK {
            return Err(SetupError::Backend(self.library.error_or("setup failed")));
        }

        self.ready = true;
        Ok(())
    }

    async fn inference(&self, input: &str) -> Result<InferenceOutput, InferenceError> {
        if !self.ready {
            return Err(InferenceError::NotReady);
        }
        let cinput = c_string(input, "input").map_err(InferenceError::InvalidInput)?;

        let payload = {
            let handle = self
                .handle
                .lock()
                .map_err(|_| InferenceError::Backend("adapter lock poisoned".to_string()))?;
            let out = unsafe { (self.library.api.inference)(handle.0, cinput.as_ptr()) };
            if out.is_null() {
                return Err(InferenceError::Backend(
                    self.library.error_or("inference failed"),
                ));
            }
            self.library.take_string(out)
        };

        match serde_json::from_str::<Value>(&payload) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(InferenceError::Backend(
                "adapter returned a non-object result".to_string(),
            )),
            Err(e) => Err(InferenceError::Backend(format!(
                "adapter returned malformed JSON: {}",
                e
            ))),
        }
    }

    fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata {
            adapter: self.library.id.clone(),
            version: self.library.semver.clone(),
            reentrant: false,
        }
    }
}

impl Drop for PluginAdapter {
    fn drop(&mut self) {
        let handle = self.handle.get_mut().unwrap_or_else(|p| p.into_inner());
        if !handle.0.is_null() {
            unsafe { (self.library.api.destroy)(handle.0) };
            handle.0 = std::ptr::null_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_open_rejects_non_library_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(libloading::library_filename("broken"));
        fs::write(&path, b"this is not a shared library").unwrap();

        match PluginLibrary::open("broken", &path) {
            Err(LoadError::InvalidAdapter { name, reason }) => {
                assert_eq!(name, "broken");
                assert!(reason.contains("failed to load"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("garbage file loaded as an adapter"),
        }
    }
}
