//! C-ABI FFI bindings for cross-language integration.
//!
//! Every call that produces data returns a [`PdfshrinkResult`] whose `data`
//! holds a JSON report. Free it with `pdfshrink_free_result`.

use std::ffi::{c_char, CStr, CString};
use std::path::Path;
use std::ptr;

use crate::{
    downsample_file_with_options, inspect_file, DownsampleOptions, QualityPreset, ShrinkOptions,
    Shrinker,
};

/// Result structure returned by FFI functions.
#[repr(C)]
pub struct PdfshrinkResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// JSON report (null if failed). Must be freed with `pdfshrink_free_string`.
    pub data: *mut c_char,
    /// Error message (null if succeeded). Must be freed with `pdfshrink_free_string`.
    pub error: *mut c_char,
}

impl PdfshrinkResult {
    fn success(data: String) -> Self {
        Self {
            success: true,
            data: CString::new(data).unwrap_or_default().into_raw(),
            error: ptr::null_mut(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: ptr::null_mut(),
            error: CString::new(message).unwrap_or_default().into_raw(),
        }
    }
}

unsafe fn path_arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("{} cannot be null", what));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| format!("Invalid UTF-8 {}", what.to_lowercase()))
}

/// Grayscale and downsample the images of `input` into `output`.
///
/// A `dpi` of zero or less selects the default of 300.
///
/// # Safety
///
/// `input` and `output` must be valid null-terminated UTF-8 strings.
/// The returned result must be freed with `pdfshrink_free_result`.
#[no_mangle]
pub unsafe extern "C" fn pdfshrink_downsample_file(
    input: *const c_char,
    output: *const c_char,
    dpi: f32,
) -> PdfshrinkResult {
    let (input, output) = match (path_arg(input, "Input"), path_arg(output, "Output")) {
        (Ok(i), Ok(o)) => (i, o),
        (Err(e), _) | (_, Err(e)) => return PdfshrinkResult::error(e),
    };

    let mut options = DownsampleOptions::new();
    if dpi > 0.0 {
        options = options.with_dpi(dpi);
    }

    match downsample_file_with_options(input, output, options).and_then(|r| r.to_json(false)) {
        Ok(json) => PdfshrinkResult::success(json),
        Err(e) => PdfshrinkResult::error(e.to_string()),
    }
}

/// Downsample and compress `input` into `output` with Ghostscript.
///
/// `preset` is one of `high_quality`, `balanced` or `max_compression`;
/// null or an unknown name selects `balanced`.
///
/// # Safety
///
/// `input` and `output` must be valid null-terminated UTF-8 strings.
/// `preset` must be null or a valid null-terminated string.
/// The returned result must be freed with `pdfshrink_free_result`.
#[no_mangle]
pub unsafe extern "C" fn pdfshrink_shrink_file(
    input: *const c_char,
    output: *const c_char,
    preset: *const c_char,
) -> PdfshrinkResult {
    let (input, output) = match (path_arg(input, "Input"), path_arg(output, "Output")) {
        (Ok(i), Ok(o)) => (i, o),
        (Err(e), _) | (_, Err(e)) => return PdfshrinkResult::error(e),
    };

    let preset = if preset.is_null() {
        QualityPreset::default()
    } else {
        QualityPreset::from_name_or_default(&CStr::from_ptr(preset).to_string_lossy())
    };

    let result = Shrinker::new(ShrinkOptions::new().with_preset(preset))
        .and_then(|shrinker| shrinker.shrink_file(input, output))
        .and_then(|report| report.to_json(false));

    match result {
        Ok(json) => PdfshrinkResult::success(json),
        Err(e) => PdfshrinkResult::error(e.to_string()),
    }
}

/// List images per page with their target sizes, as JSON.
///
/// # Safety
///
/// The `path` must be a valid null-terminated UTF-8 string.
/// The returned result must be freed with `pdfshrink_free_result`.
#[no_mangle]
pub unsafe extern "C" fn pdfshrink_inspect_file(path: *const c_char) -> PdfshrinkResult {
    let path = match path_arg(path, "Path") {
        Ok(p) => p,
        Err(e) => return PdfshrinkResult::error(e),
    };

    let result = inspect_file(path)
        .and_then(|pages| serde_json::to_string(&pages).map_err(crate::Error::from));

    match result {
        Ok(json) => PdfshrinkResult::success(json),
        Err(e) => PdfshrinkResult::error(e.to_string()),
    }
}

/// Check if a file is a PDF.
///
/// # Safety
///
/// The `path` must be a valid null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn pdfshrink_is_pdf(path: *const c_char) -> bool {
    match path_arg(path, "Path") {
        Ok(p) => crate::detect::detect_format_from_path(Path::new(p)).is_ok(),
        Err(_) => false,
    }
}

/// Free a result returned by any pdfshrink function.
///
/// # Safety
///
/// The `result` must have been returned by a pdfshrink function.
/// This function should only be called once per result.
#[no_mangle]
pub unsafe extern "C" fn pdfshrink_free_result(result: PdfshrinkResult) {
    if !result.data.is_null() {
        drop(CString::from_raw(result.data));
    }
    if !result.error.is_null() {
        drop(CString::from_raw(result.error));
    }
}

/// Free a string allocated by pdfshrink.
///
/// # Safety
///
/// The `ptr` must have been allocated by pdfshrink.
/// This function should only be called once per pointer.
#[no_mangle]
pub unsafe extern "C" fn pdfshrink_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Library version. Statically allocated; do not free.
#[no_mangle]
pub extern "C" fn pdfshrink_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
