//! Dummy adapter: C-ABI shim that reports the byte length of its input.
//!
//! Copy the built library into the registry's adapters directory and declare a
//! model with `"adapter": "dummy"` to serve it.

use core::ffi::{c_char, c_void};
use std::{
    cell::RefCell,
    ffi::{CStr, CString},
    path::PathBuf,
};

use adapter_abi::*;

// -----------------------------
// Error plumbing (thread-local)
// -----------------------------

thread_local! {
    static LAST_ERR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: impl AsRef<str>) -> i32 {
    let s = CString::new(msg.as_ref().replace('\0', "")).unwrap_or_default();
    LAST_ERR.with(|slot| *slot.borrow_mut() = Some(s));
    ERR_FAIL
}

unsafe extern "C" fn last_error() -> AdapterString {
    LAST_ERR.with(|slot| match slot.borrow().as_ref() {
        Some(cs) => AdapterString::new(&cs.to_string_lossy()),
        None => AdapterString::null(),
    })
}

unsafe extern "C" fn free_string(s: AdapterString) {
    unsafe { s.release() };
}

unsafe fn read_str<'a>(p: *const c_char, what: &str) -> Result<&'a str, String> {
    if p.is_null() {
        return Err(format!("null {what}"));
    }
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map_err(|e| format!("invalid UTF-8 in {what}: {e}"))
}

// -----------------------------
// Backend handle
// -----------------------------

#[derive(Default)]
struct Session {
    model_path: Option<PathBuf>,
}

unsafe extern "C" fn create() -> *mut c_void {
    Box::into_raw(Box::<Session>::default()) as *mut c_void
}

unsafe extern "C" fn destroy(handle: *mut c_void) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle as *mut Session) });
    }
}

unsafe extern "C" fn setup(
    handle: *mut c_void,
    model_path: *const c_char,
    params_json: *const c_char,
    _device: *const c_char,
) -> i32 {
    if handle.is_null() {
        return set_last_error("null handle");
    }
    let session = unsafe { &mut *(handle as *mut Session) };
    if session.model_path.is_some() {
        return set_last_error("adapter already set up");
    }

    let path = match unsafe { read_str(model_path, "model path") } {
        Ok(p) => PathBuf::from(p),
        Err(e) => return set_last_error(e),
    };
    if !path.exists() {
        return set_last_error(format!("model artifact not found: {}", path.display()));
    }

    let params = match unsafe { read_str(params_json, "params") } {
        Ok(p) => p,
        Err(e) => return set_last_error(e),
    };
    match serde_json::from_str::<serde_json::Value>(params) {
        Ok(v) if v.is_object() => {}
        Ok(_) => return set_last_error("params must be a JSON object"),
        Err(e) => return set_last_error(format!("bad params JSON: {e}")),
    }

    session.model_path = Some(path);
    ERR_OK
}

unsafe extern "C" fn inference(handle: *mut c_void, input: *const c_char) -> AdapterString {
    if handle.is_null() {
        set_last_error("null handle");
        return AdapterString::null();
    }
    let session = unsafe { &*(handle as *const Session) };
    if session.model_path.is_none() {
        set_last_error("adapter not set up");
        return AdapterString::null();
    }
    let text = match unsafe { read_str(input, "input") } {
        Ok(t) => t,
        Err(e) => {
            set_last_error(e);
            return AdapterString::null();
        }
    };

    let out = serde_json::json!({ "length": text.len() });
    AdapterString::new(&out.to_string())
}

// -----------------------------
// Static AdapterApi surface
// -----------------------------

static API: AdapterApi = AdapterApi {
    info: AdapterInfo {
        abi_version: ADAPTER_ABI_VERSION,
        id: b"dummy\0".as_ptr() as *const c_char,
        semver: b"0.1.0\0".as_ptr() as *const c_char,
    },
    create,
    destroy,
    setup,
    inference,
    last_error,
    free_string,
};

#[no_mangle]
pub extern "C" fn model_adapter_entry_v1() -> *const AdapterApi {
    &API as *const AdapterApi
}
