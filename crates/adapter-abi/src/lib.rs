//! Adapter ABI: the C contract between the model-registry host and adapters
//! loaded at runtime from the adapters directory.
//!
//! An adapter library exports [`ADAPTER_ENTRY_SYMBOL`], which returns a pointer
//! to a static [`AdapterApi`]. The host checks `info.abi_version` against
//! [`ADAPTER_ABI_VERSION`] before using any other entry in the table.

use core::ffi::{c_char, c_void};
use std::ffi::CString;

/// Bump this when you break the ABI. Host checks it at load time.
pub const ADAPTER_ABI_VERSION: u32 = 1;

pub const ADAPTER_ENTRY_SYMBOL: &str = "model_adapter_entry_v1";

pub const ERR_OK: i32 = 0;
pub const ERR_FAIL: i32 = 1;

/// Owned UTF-8 buffer handed across the boundary. Always NUL-terminated; `len`
/// excludes the terminator. Must be released with the `free_string` of the
/// library that produced it.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AdapterString {
    pub ptr: *mut c_char,
    pub len: usize,
}

impl AdapterString {
    pub const fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Allocates a buffer for `s`. Interior NULs are stripped.
    pub fn new(s: &str) -> Self {
        let cs = CString::new(s.replace('\0', "")).unwrap_or_default();
        let len = cs.as_bytes().len();
        let ptr = cs.into_raw();
        Self { ptr, len }
    }

    /// Releases a buffer produced by [`AdapterString::new`].
    ///
    /// # Safety
    /// `self` must come from `new` in this same library and must not be
    /// used afterwards.
    pub unsafe fn release(self) {
        if !self.ptr.is_null() {
            drop(unsafe { CString::from_raw(self.ptr) });
        }
    }
}

#[repr(C)]
pub struct AdapterInfo {
    pub abi_version: u32,
    pub id: *const c_char,     // "dummy"
    pub semver: *const c_char, // "0.1.0"
}

// ---------- Function pointer types (C ABI) ----------

/// Returns a fresh, uninitialized backend instance, or null on failure.
pub type CreateFn = unsafe extern "C" fn() -> *mut c_void;
pub type DestroyFn = unsafe extern "C" fn(handle: *mut c_void);

/// `params_json` is the model's `config` object encoded as JSON.
/// Returns [`ERR_OK`] or an error code; details via `last_error`.
pub type SetupFn = unsafe extern "C" fn(
    handle: *mut c_void,
    model_path: *const c_char,
    params_json: *const c_char,
    device: *const c_char,
) -> i32;

/// Returns a JSON object, or a null string on failure.
pub type InferenceFn =
    unsafe extern "C" fn(handle: *mut c_void, input: *const c_char) -> AdapterString;

pub type LastErrorFn = unsafe extern "C" fn() -> AdapterString;
pub type FreeStringFn = unsafe extern "C" fn(s: AdapterString);

// ---------- VTable ----------

#[repr(C)]
pub struct AdapterApi {
    pub info: AdapterInfo,

    pub create: CreateFn,
    pub destroy: DestroyFn,

    pub setup: SetupFn,
    pub inference: InferenceFn,

    // Diagnostics & memory management
    pub last_error: LastErrorFn,
    pub free_string: FreeStringFn,
}

// SAFETY: the table is immutable after construction and `info` only points
// at static NUL-terminated strings.
unsafe impl Sync for AdapterApi {}
unsafe impl Send for AdapterApi {}

/// Adapter must export `model_adapter_entry_v1` returning a pointer to a static `AdapterApi`.
pub type AdapterEntryFn = unsafe extern "C" fn() -> *const AdapterApi;
