//! C-ABI wrapper around `truthmark-core`.
//!
//! # Overview
//! Exposes the watermark client through `extern "C"` functions so the
//! SDKs for other languages share one implementation of request
//! construction, auth, and response mapping. Two styles are offered:
//! - one-shot calls (`truthmark_encode`, `truthmark_decode`,
//!   `truthmark_download`) that perform blocking HTTP I/O in Rust;
//! - host-does-IO calls (`truthmark_build_*` / `truthmark_parse_*`) for
//!   hosts that must use their own HTTP stack.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A single `FfiResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `truthmark_client_free` / `truthmark_free_result` to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Duration;

use truthmark_core::{ClientConfig, HttpResponse, ImageSource, WatermarkClient};

use types::*;

/// Borrow a required C string argument.
///
/// `Err` carries the ready-made failure result for null or non-UTF-8 input.
fn str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, *mut FfiResult> {
    if ptr.is_null() {
        return Err(FfiResult::null_arg(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiResult::invalid_arg(name))
}

/// Borrow an optional C string; null and invalid UTF-8 both yield `None`.
fn opt_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client.
///
/// `base_url` null → `http://localhost:8000`; `api_key` null → no auth
/// header; `timeout_ms` 0 → 30 seconds. Returns null when the configuration
/// is rejected (bad scheme, blank key, non-UTF-8 input) or on panic.
/// The caller must free the returned pointer with `truthmark_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_client_new(
    base_url: *const c_char,
    api_key: *const c_char,
    timeout_ms: u64,
) -> *mut FfiClient {
    catch_unwind(|| {
        let mut config = ClientConfig::default();
        if !base_url.is_null() {
            match opt_str(base_url) {
                Some(url) => config.base_url = url.to_string(),
                None => return std::ptr::null_mut(),
            }
        }
        if !api_key.is_null() {
            match opt_str(api_key) {
                Some(key) => config.api_key = Some(key.to_string()),
                None => return std::ptr::null_mut(),
            }
        }
        if timeout_ms > 0 {
            config.timeout = Duration::from_millis(timeout_ms);
        }
        match WatermarkClient::new(config) {
            Ok(client) => Box::into_raw(Box::new(FfiClient { inner: client })),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `truthmark_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_client_free(client: *mut FfiClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// One-shot operations
// ---------------------------------------------------------------------------

/// Embed `message` into the image at `path`.
///
/// Returns a result with `data_tag = Encode` on success.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_encode(
    client: *const FfiClient,
    path: *const c_char,
    message: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let path = match str_arg(path, "path") {
            Ok(p) => p,
            Err(result) => return result,
        };
        let message = match str_arg(message, "message") {
            Ok(m) => m,
            Err(result) => return result,
        };
        match client.inner.encode(&ImageSource::path(path), message) {
            Ok(result) => FfiResult::ok_encode(result),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in truthmark_encode"))
}

/// Extract a watermark from the image at `path`.
///
/// Returns a result with `data_tag = Decode` on success.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_decode(client: *const FfiClient, path: *const c_char) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let path = match str_arg(path, "path") {
            Ok(p) => p,
            Err(result) => return result,
        };
        match client.inner.decode(&ImageSource::path(path)) {
            Ok(result) => FfiResult::ok_decode(result),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in truthmark_decode"))
}

/// Fetch `download_url` (as returned by encode) into `output_path`.
///
/// Returns a result with `data_tag = None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_download(
    client: *const FfiClient,
    download_url: *const c_char,
    output_path: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let url = match str_arg(download_url, "download_url") {
            Ok(u) => u,
            Err(result) => return result,
        };
        let output = match str_arg(output_path, "output_path") {
            Ok(o) => o,
            Err(result) => return result,
        };
        match client.inner.download_from(url, Path::new(output)) {
            Ok(_) => FfiResult::ok_empty(),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in truthmark_download"))
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build the multipart request for encoding the image at `path`.
///
/// Returns a result with `data_tag = Request` and `data` pointing to an
/// `FfiHttpRequest` on success. A missing or unreadable image is reported
/// as `SourceNotFound`. The request is released with the result by
/// `truthmark_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_build_encode(
    client: *const FfiClient,
    path: *const c_char,
    message: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let path = match str_arg(path, "path") {
            Ok(p) => p,
            Err(result) => return result,
        };
        let message = match str_arg(message, "message") {
            Ok(m) => m,
            Err(result) => return result,
        };
        match client.inner.api().build_encode(&ImageSource::path(path), message) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in truthmark_build_encode"))
}

/// Build the multipart request for decoding the image at `path`.
///
/// Same result contract as `truthmark_build_encode`.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_build_decode(
    client: *const FfiClient,
    path: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let client = unsafe { &*client };
        let path = match str_arg(path, "path") {
            Ok(p) => p,
            Err(result) => return result,
        };
        match client.inner.api().build_decode(&ImageSource::path(path)) {
            Ok(req) => FfiResult::ok_request(req),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in truthmark_build_decode"))
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Copy an `FfiHttpResponse` into a core `HttpResponse`.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = if resp.body.is_null() || resp.body_len == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(resp.body, resp.body_len) }.to_vec()
    };
    HttpResponse::new(resp.status, body)
}

/// Parse the response to an encode request.
///
/// Returns a result with `data_tag = Encode` on success.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_parse_encode(
    client: *const FfiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        match client.inner.api().parse_encode(ffi_response_to_core(resp)) {
            Ok(result) => FfiResult::ok_encode(result),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in truthmark_parse_encode"))
}

/// Parse the response to a decode request.
///
/// Returns a result with `data_tag = Decode` on success.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_parse_decode(
    client: *const FfiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        match client.inner.api().parse_decode(ffi_response_to_core(resp)) {
            Ok(result) => FfiResult::ok_decode(result),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in truthmark_parse_decode"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Release an `FfiHttpRequest` owned by a `Request`-tagged result.
///
/// # Safety
/// `req` must come from `FfiResult::ok_request` and not have been freed.
unsafe fn free_request(req: *mut FfiHttpRequest) {
    let req = unsafe { Box::from_raw(req) };
    free_c_string(req.url);
    unsafe { free_bytes(req.body, req.body_len) };
    if !req.headers.is_null() && req.headers_len > 0 {
        let headers = unsafe {
            Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                req.headers,
                req.headers_len as usize,
            ))
        };
        for h in headers.iter() {
            free_c_string(h.key);
            free_c_string(h.value);
        }
    }
}

/// Free an `FfiResult` returned by any operation, build or parse function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn truthmark_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::Encode => {
                let payload = unsafe { Box::from_raw(result.data as *mut FfiEncodeResult) };
                free_c_string(payload.status);
                free_c_string(payload.download_url);
            }
            FfiDataTag::Decode => {
                let payload = unsafe { Box::from_raw(result.data as *mut FfiDecodeResult) };
                free_c_string(payload.message);
            }
            FfiDataTag::Request => unsafe { free_request(result.data as *mut FfiHttpRequest) },
            FfiDataTag::None => {}
        }
    }));
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn new_client(url: &str) -> *mut FfiClient {
        let url = CString::new(url).unwrap();
        truthmark_client_new(url.as_ptr(), std::ptr::null(), 0)
    }

    fn write_image(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> CString {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        CString::new(path.to_str().unwrap()).unwrap()
    }

    fn header(req: &FfiHttpRequest, name: &str) -> Option<String> {
        let headers = unsafe { std::slice::from_raw_parts(req.headers, req.headers_len as usize) };
        headers.iter().find_map(|h| {
            let key = unsafe { CStr::from_ptr(h.key) }.to_str().unwrap();
            key.eq_ignore_ascii_case(name)
                .then(|| unsafe { CStr::from_ptr(h.value) }.to_str().unwrap().to_string())
        })
    }

    #[test]
    fn client_new_and_free() {
        let client = new_client("http://localhost:8000");
        assert!(!client.is_null());
        truthmark_client_free(client);
    }

    #[test]
    fn client_new_all_null_uses_defaults() {
        let client = truthmark_client_new(std::ptr::null(), std::ptr::null(), 0);
        assert!(!client.is_null());
        let config = unsafe { &*client }.inner.api().config().clone();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(30));
        truthmark_client_free(client);
    }

    #[test]
    fn client_new_invalid_config_returns_null() {
        assert!(new_client("localhost:8000").is_null());
        let url = CString::new("http://localhost:8000").unwrap();
        let blank = CString::new("  ").unwrap();
        assert!(truthmark_client_new(url.as_ptr(), blank.as_ptr(), 0).is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        truthmark_client_free(std::ptr::null_mut());
    }

    #[test]
    fn build_encode_returns_multipart_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir, "in.png", b"\x89PNG\0binary");
        let key = CString::new("k").unwrap();
        let url = CString::new("http://localhost:8000").unwrap();
        let client = truthmark_client_new(url.as_ptr(), key.as_ptr(), 0);
        let message = CString::new("hello").unwrap();

        let result = truthmark_build_encode(client, path.as_ptr(), message.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::Request);
        let req_ref = unsafe { &*(r.data as *const FfiHttpRequest) };
        assert!(matches!(req_ref.method, FfiHttpMethod::Post));
        let url = unsafe { CStr::from_ptr(req_ref.url) }.to_str().unwrap();
        assert_eq!(url, "http://localhost:8000/v1/encode");
        assert_eq!(header(req_ref, "authorization").as_deref(), Some("Bearer k"));
        assert!(header(req_ref, "content-type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));

        let body = unsafe { std::slice::from_raw_parts(req_ref.body, req_ref.body_len) };
        assert!(body.windows(12).any(|w| w == b"\x89PNG\0binary"));
        assert!(String::from_utf8_lossy(body).contains("\r\n\r\nhello\r\n"));

        truthmark_free_result(result);
        truthmark_client_free(client);
    }

    #[test]
    fn build_decode_missing_file_is_source_not_found() {
        let client = new_client("http://localhost:8000");
        let path = CString::new("/no/such/file.png").unwrap();

        let result = truthmark_build_decode(client, path.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::SourceNotFound);
        assert_eq!(r.data_tag, FfiDataTag::None);
        assert!(r.data.is_null());
        let text = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
        assert!(text.contains("/no/such/file.png"), "{text}");
        truthmark_free_result(result);

        truthmark_client_free(client);
    }

    #[test]
    fn build_decode_null_path_is_null_arg() {
        let client = new_client("http://localhost:8000");
        let result = truthmark_build_decode(client, std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        truthmark_free_result(result);
        truthmark_client_free(client);
    }

    #[test]
    fn build_null_client_is_null_arg() {
        let path = CString::new("/tmp/x.png").unwrap();
        let result = truthmark_build_decode(std::ptr::null(), path.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        truthmark_free_result(result);
    }

    #[test]
    fn build_encode_invalid_utf8_path() {
        let client = new_client("http://localhost:8000");
        let path = CString::new(vec![0xffu8, 0xfe]).unwrap();
        let message = CString::new("m").unwrap();
        let result = truthmark_build_encode(client, path.as_ptr(), message.as_ptr());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::InvalidArgument);
        truthmark_free_result(result);
        truthmark_client_free(client);
    }

    #[test]
    fn encode_missing_file_is_source_not_found() {
        let client = new_client("http://127.0.0.1:9");
        let path = CString::new("/no/such/file.png").unwrap();
        let message = CString::new("m").unwrap();
        let result = truthmark_encode(client, path.as_ptr(), message.as_ptr());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::SourceNotFound);
        assert!(!r.error_message.is_null());
        assert!(r.data.is_null());

        truthmark_free_result(result);
        truthmark_client_free(client);
    }

    #[test]
    fn encode_null_message_is_null_arg() {
        let client = new_client("http://localhost:8000");
        let path = CString::new("/tmp/x.png").unwrap();
        let result = truthmark_encode(client, path.as_ptr(), std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        truthmark_free_result(result);
        truthmark_client_free(client);
    }

    #[test]
    fn parse_encode_success() {
        let client = new_client("http://localhost:8000");
        let body = br#"{"status":"ok","metadata":{"psnr":42.5,"bits_embedded":128},"download_url":"http://x/y.png"}"#;
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
            body_len: body.len(),
        };
        let result = truthmark_parse_encode(client, &resp);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.data_tag, FfiDataTag::Encode);

        let payload = unsafe { &*(r.data as *const FfiEncodeResult) };
        assert_eq!(payload.psnr, 42.5);
        assert_eq!(payload.bits_embedded, 128);
        let url = unsafe { CStr::from_ptr(payload.download_url) }.to_str().unwrap();
        assert_eq!(url, "http://x/y.png");

        truthmark_free_result(result);
        truthmark_client_free(client);
    }

    #[test]
    fn parse_decode_found_and_not_found() {
        let client = new_client("http://localhost:8000");

        let body = br#"{"found":true,"message":"hello","confidence":0.97}"#;
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
            body_len: body.len(),
        };
        let result = truthmark_parse_decode(client, &resp);
        let payload = unsafe { &*((*result).data as *const FfiDecodeResult) };
        assert!(payload.found);
        assert_eq!(unsafe { CStr::from_ptr(payload.message) }.to_str().unwrap(), "hello");
        assert_eq!(payload.confidence, 0.97);
        truthmark_free_result(result);

        let body = br#"{"found":false,"message":"leftover","confidence":0.1}"#;
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
            body_len: body.len(),
        };
        let result = truthmark_parse_decode(client, &resp);
        let payload = unsafe { &*((*result).data as *const FfiDecodeResult) };
        assert!(!payload.found);
        assert!(payload.message.is_null());
        truthmark_free_result(result);

        truthmark_client_free(client);
    }

    #[test]
    fn parse_error_status_sets_http_status() {
        let client = new_client("http://localhost:8000");
        for status in [401u16, 500] {
            let resp = FfiHttpResponse {
                status,
                body: std::ptr::null(),
                body_len: 0,
            };
            let result = truthmark_parse_decode(client, &resp);
            let r = unsafe { &*result };
            assert_eq!(r.error_code, FfiErrorCode::Api);
            assert_eq!(r.http_status, status);
            assert!(r.data.is_null());
            truthmark_free_result(result);
        }
        truthmark_client_free(client);
    }

    #[test]
    fn parse_bad_json_is_deserialization() {
        let client = new_client("http://localhost:8000");
        let body = b"<html>";
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
            body_len: body.len(),
        };
        let result = truthmark_parse_encode(client, &resp);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::Deserialization);
        truthmark_free_result(result);
        truthmark_client_free(client);
    }

    #[test]
    fn parse_null_arguments() {
        let resp = FfiHttpResponse {
            status: 200,
            body: std::ptr::null(),
            body_len: 0,
        };
        let result = truthmark_parse_encode(std::ptr::null(), &resp);
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        truthmark_free_result(result);

        let client = new_client("http://localhost:8000");
        let result = truthmark_parse_decode(client, std::ptr::null());
        assert_eq!(unsafe { &*result }.error_code, FfiErrorCode::NullArg);
        truthmark_free_result(result);
        truthmark_client_free(client);
    }

    #[test]
    fn free_result_null_is_safe() {
        truthmark_free_result(std::ptr::null_mut());
    }
}
