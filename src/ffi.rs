//! FFI bindings for the biosignature engine
//!
//! This module provides C-compatible functions for calling the engine from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `biosig_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, TimeZone, Utc};

use crate::config::EngineConfig;
use crate::encoder::ReportEncoder;
use crate::period::{format_date, week_start_of};
use crate::pipeline::{metrics_to_report_json, samples_to_weekly_json, SynergyEngine};
use crate::snapshot::should_snapshot;
use crate::types::{MetricSample, MetricValues};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn millis_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score a JSON metrics object and return a JSON report.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `biosig_free_string`.
/// - Returns NULL on error; call `biosig_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn biosig_score_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    match metrics_to_report_json(json_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Score a JSON array of samples week by week and return a JSON report.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `biosig_free_string`.
/// - Returns NULL on error; call `biosig_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn biosig_weekly_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    match samples_to_weekly_json(json_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Evaluate the default 7-day snapshot gate.
///
/// `latest_ms` is the latest snapshot's creation time in epoch milliseconds,
/// or any negative value when no snapshot exists.
///
/// # Safety
/// - Returns 1 when a snapshot is due, 0 when not, -1 on invalid timestamps.
#[no_mangle]
pub unsafe extern "C" fn biosig_should_snapshot(latest_ms: i64, now_ms: i64) -> i32 {
    clear_last_error();

    let Some(now) = millis_to_utc(now_ms) else {
        set_last_error("Invalid now timestamp");
        return -1;
    };

    let latest = if latest_ms < 0 {
        None
    } else {
        match millis_to_utc(latest_ms) {
            Some(latest) => Some(latest),
            None => {
                set_last_error("Invalid latest snapshot timestamp");
                return -1;
            }
        }
    };

    i32::from(should_snapshot(latest, now))
}

/// Monday (`YYYY-MM-DD`) of the UTC week containing `epoch_ms`.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `biosig_free_string`.
/// - Returns NULL on error; call `biosig_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn biosig_week_start(epoch_ms: i64) -> *mut c_char {
    clear_last_error();

    let Some(instant) = millis_to_utc(epoch_ms) else {
        set_last_error("Invalid timestamp");
        return ptr::null_mut();
    };

    match week_start_of(instant) {
        Some(monday) => string_to_cstr(&format_date(monday)),
        None => {
            set_last_error("Timestamp precedes the first representable week");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Configured Engine API
// ============================================================================

/// Opaque handle to a SynergyEngine
pub struct EngineHandle {
    engine: SynergyEngine,
    encoder: ReportEncoder,
}

/// Create an engine from a JSON configuration, or the defaults when `config_json` is NULL.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `biosig_engine_free`.
/// - Returns NULL on error; call `biosig_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn biosig_engine_new(config_json: *const c_char) -> *mut EngineHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        Ok(EngineConfig::default())
    } else {
        match cstr_to_string(config_json) {
            Some(json) => EngineConfig::from_json(&json),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match config.and_then(SynergyEngine::new) {
        Ok(engine) => Box::into_raw(Box::new(EngineHandle {
            engine,
            encoder: ReportEncoder::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `biosig_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn biosig_engine_free(engine: *mut EngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Score a JSON metrics object with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `biosig_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `biosig_free_string`.
/// - Returns NULL on error; call `biosig_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn biosig_engine_score(
    engine: *const EngineHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    let result = serde_json::from_str::<MetricValues>(&json_str)
        .map_err(crate::ComputeError::from)
        .and_then(|values| handle.encoder.encode_to_json(&handle.engine.evaluate(&values)));

    match result {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Score a JSON array of samples week by week with a configured engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `biosig_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `biosig_free_string`.
/// - Returns NULL on error; call `biosig_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn biosig_engine_weekly(
    engine: *const EngineHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &*engine;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    let result = serde_json::from_str::<Vec<MetricSample>>(&json_str)
        .map_err(crate::ComputeError::from)
        .and_then(|samples| handle.engine.score_samples(&samples))
        .and_then(|outcomes| handle.encoder.encode_to_json(&outcomes));

    match result {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by engine functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an engine function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn biosig_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next engine function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn biosig_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the engine library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn biosig_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
