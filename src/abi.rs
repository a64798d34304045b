//! Purpose: C ABI bridge for hosts that embed the marshalling engine (libslicecfg).
//! Exports: `slc_describe_config`, `slc_prepare_job`, and buffer/error free helpers.
//! Role: Stable ABI surface for non-Rust callers; JSON bytes in, JSON bytes out.
//! Invariants: Every output buffer and error is owned by the caller until freed here.
//! Invariants: Error kinds map 1:1 with core error kinds.
//! Notes: A null or empty registry means "registry unavailable", not an error.
#![allow(clippy::result_large_err)]

use crate::api::{
    AliasTable, EngineConfig, JobContext, OptionRegistry, describe_config, prepare_job,
};
use crate::core::error::{Error, ErrorKind};
use serde_json::Value;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

#[repr(C)]
pub struct slc_buf {
    data: *mut u8,
    len: usize,
}

#[repr(C)]
pub struct slc_error {
    kind: i32,
    message: *mut c_char,
    key: *mut c_char,
    path: *mut c_char,
}

/// Write the schema document for `registry_json` into `out_buf`.
#[unsafe(no_mangle)]
pub extern "C" fn slc_describe_config(
    registry_json: *const u8,
    registry_len: usize,
    out_buf: *mut slc_buf,
    out_err: *mut *mut slc_error,
) -> i32 {
    let registry = match load_registry(registry_json, registry_len) {
        Ok(registry) => registry,
        Err(err) => return fail(out_err, err),
    };
    let config = EngineConfig::from_env();
    let result = describe_config(registry.as_ref(), &config).and_then(|doc| {
        serde_json::to_value(&doc).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to serialize schema")
                .with_source(err)
        })
    });
    match result.and_then(|value| write_json_buf(out_buf, &value)) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

/// Prepare a job from a registry and an override payload; writes `{config, rotation, diagnostics}`.
#[unsafe(no_mangle)]
pub extern "C" fn slc_prepare_job(
    registry_json: *const u8,
    registry_len: usize,
    payload_json: *const u8,
    payload_len: usize,
    out_buf: *mut slc_buf,
    out_err: *mut *mut slc_error,
) -> i32 {
    let registry = match load_registry(registry_json, registry_len) {
        Ok(registry) => registry,
        Err(err) => return fail(out_err, err),
    };
    let ctx = if payload_json.is_null() || payload_len == 0 {
        JobContext::new()
    } else {
        let bytes = unsafe { std::slice::from_raw_parts(payload_json, payload_len) };
        JobContext::from_payload_bytes(bytes)
    };
    let config = EngineConfig::from_env();
    let job = prepare_job(registry.as_ref(), &AliasTable::legacy(), &config, ctx);
    match write_json_buf(out_buf, &job.to_json(registry.as_ref())) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn slc_buf_free(buf: *mut slc_buf) {
    if buf.is_null() {
        return;
    }
    unsafe {
        let buf = &mut *buf;
        if !buf.data.is_null() && buf.len != 0 {
            drop(Vec::from_raw_parts(buf.data, buf.len, buf.len));
        }
        buf.data = ptr::null_mut();
        buf.len = 0;
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn slc_error_free(err: *mut slc_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        for text in [err.message, err.key, err.path] {
            if !text.is_null() {
                drop(CString::from_raw(text));
            }
        }
    }
}

fn load_registry(bytes: *const u8, len: usize) -> Result<Option<OptionRegistry>, Error> {
    if bytes.is_null() || len == 0 {
        return Ok(None);
    }
    let slice = unsafe { std::slice::from_raw_parts(bytes, len) };
    let text = std::str::from_utf8(slice).map_err(|err| {
        Error::new(ErrorKind::InvalidRegistry)
            .with_message("registry is not valid utf-8")
            .with_source(err)
    })?;
    OptionRegistry::from_json_str(text).map(Some)
}

fn write_json_buf(out_buf: *mut slc_buf, value: &Value) -> Result<(), Error> {
    if out_buf.is_null() {
        return Err(Error::new(ErrorKind::Usage).with_message("out_buf is null"));
    }
    let json_bytes = serde_json::to_vec(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to serialize response")
            .with_source(err)
    })?;
    unsafe {
        let buf = &mut *out_buf;
        let mut data = json_bytes.into_boxed_slice();
        buf.len = data.len();
        buf.data = data.as_mut_ptr();
        std::mem::forget(data);
    }
    Ok(())
}

fn fail(out_err: *mut *mut slc_error, err: Error) -> i32 {
    if out_err.is_null() {
        return -1;
    }
    let error = Box::new(slc_error {
        kind: error_kind_code(err.kind()),
        message: to_c_string(err.message().unwrap_or("")),
        key: err.key().map(to_c_string).unwrap_or(ptr::null_mut()),
        path: err
            .path()
            .map(|path| to_c_string(path.to_string_lossy().as_ref()))
            .unwrap_or(ptr::null_mut()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn error_kind_code(kind: ErrorKind) -> i32 {
    crate::core::error::to_exit_code(kind)
}

#[cfg(test)]
mod tests {
    use super::{
        slc_buf, slc_buf_free, slc_describe_config, slc_error, slc_error_free, slc_prepare_job,
    };
    use serde_json::{Value, json};
    use std::ffi::CStr;
    use std::ptr;

    const REGISTRY: &str = r#"{"options": [
        {"key": "wall_loops", "type": "int", "default": 3, "category": "Strength"},
        {"key": "enable_support", "type": "bool", "default": true}
    ]}"#;

    fn take_json(buf: &mut slc_buf) -> Value {
        let bytes = unsafe { std::slice::from_raw_parts(buf.data, buf.len) };
        let value = serde_json::from_slice(bytes).expect("json");
        slc_buf_free(buf);
        assert!(buf.data.is_null());
        value
    }

    #[test]
    fn describe_config_round_trip() {
        let mut buf = slc_buf {
            data: ptr::null_mut(),
            len: 0,
        };
        let mut err: *mut slc_error = ptr::null_mut();
        let rc = slc_describe_config(REGISTRY.as_ptr(), REGISTRY.len(), &mut buf, &mut err);
        assert_eq!(rc, 0);
        assert!(err.is_null());
        let doc = take_json(&mut buf);
        assert_eq!(doc["optionCount"], json!(2));
    }

    #[test]
    fn describe_config_without_registry_is_empty() {
        let mut buf = slc_buf {
            data: ptr::null_mut(),
            len: 0,
        };
        let mut err: *mut slc_error = ptr::null_mut();
        let rc = slc_describe_config(ptr::null(), 0, &mut buf, &mut err);
        assert_eq!(rc, 0);
        let doc = take_json(&mut buf);
        assert_eq!(doc["optionCount"], json!(0));
        assert_eq!(doc["categories"], json!([]));
    }

    #[test]
    fn prepare_job_applies_payload() {
        let payload = br#"{"supports_enabled": true, "wall_loops": 6}"#;
        let mut buf = slc_buf {
            data: ptr::null_mut(),
            len: 0,
        };
        let mut err: *mut slc_error = ptr::null_mut();
        let rc = slc_prepare_job(
            REGISTRY.as_ptr(),
            REGISTRY.len(),
            payload.as_ptr(),
            payload.len(),
            &mut buf,
            &mut err,
        );
        assert_eq!(rc, 0);
        let out = take_json(&mut buf);
        assert_eq!(out["config"]["wall_loops"], json!("6"));
        assert_eq!(out["config"]["enable_support"], json!("1"));
        assert_eq!(out["diagnostics"], json!([]));
    }

    #[test]
    fn invalid_registry_reports_error_with_key() {
        let registry = r#"{"options": [{"key": "wall_loops", "type": "int", "default": "lots"}]}"#;
        let mut buf = slc_buf {
            data: ptr::null_mut(),
            len: 0,
        };
        let mut err: *mut slc_error = ptr::null_mut();
        let rc = slc_describe_config(registry.as_ptr(), registry.len(), &mut buf, &mut err);
        assert_eq!(rc, -1);
        assert!(!err.is_null());
        unsafe {
            assert_eq!((*err).kind, 4);
            let key = CStr::from_ptr((*err).key).to_str().expect("utf8");
            assert_eq!(key, "wall_loops");
        }
        slc_error_free(err);
    }
}
