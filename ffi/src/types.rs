//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec<u8>`,
//! and tagged enums with explicit discriminants. Conversion functions live
//! here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use truthmark_core::{ApiError, DecodeResult, EncodeResult, HttpMethod, WatermarkClient};

/// Opaque handle to a `WatermarkClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiClient {
    pub(crate) inner: WatermarkClient,
}

/// Owned C string with interior NULs dropped; never fails.
pub(crate) fn c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

/// Hand a byte buffer to C as pointer + length.
pub(crate) fn leak_bytes(data: Vec<u8>) -> (*mut u8, usize) {
    if data.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let boxed = data.into_boxed_slice();
    let len = boxed.len();
    (Box::into_raw(boxed) as *mut u8, len)
}

/// Reclaim a buffer produced by [`leak_bytes`].
///
/// # Safety
/// `ptr`/`len` must come from `leak_bytes` and not have been freed.
pub(crate) unsafe fn free_bytes(ptr: *mut u8, len: usize) {
    if !ptr.is_null() && len > 0 {
        drop(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)) });
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Returned inside a `Request`-tagged `FfiResult` by the
/// `truthmark_build_*` functions. The C caller sends `body_len`
/// bytes from `body` verbatim (it is binary multipart data, not a C string)
/// and passes the response back through `truthmark_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut u8,
    pub body_len: usize,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: truthmark_core::HttpRequest) -> *mut Self {
        let url = c_string(&req.url);
        let (body, body_len) = leak_bytes(req.body.unwrap_or_default());

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
            body_len,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller fills this in after executing a request and passes a
/// pointer to a `truthmark_parse_*` function. The FFI layer reads but does
/// not free these fields. `body` may be null when `body_len` is 0.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const u8,
    pub body_len: usize,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    SourceNotFound = 1,
    Network = 2,
    Api = 3,
    Deserialization = 4,
    InvalidConfig = 5,
    Io = 6,
    Panic = 7,
    NullArg = 8,
    InvalidArgument = 9,
}

/// Tag that tells `truthmark_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Encode = 1,
    Decode = 2,
    Request = 3,
}

/// Encode outcome exposed to C.
#[repr(C)]
pub struct FfiEncodeResult {
    pub status: *mut c_char,
    pub psnr: f64,
    pub bits_embedded: u64,
    pub download_url: *mut c_char,
}

/// Decode outcome exposed to C. `message` is null unless `found` is true.
#[repr(C)]
pub struct FfiDecodeResult {
    pub found: bool,
    pub message: *mut c_char,
    pub confidence: f64,
}

/// Result envelope for every operation that can fail.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload tagged by `data_tag` (null for `None`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, `http_status` is set for `Api` errors, and
/// `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut std::ffi::c_void,
}

impl FfiResult {
    fn boxed(
        error_code: FfiErrorCode,
        error_message: *mut c_char,
        http_status: u16,
        data_tag: FfiDataTag,
        data: *mut std::ffi::c_void,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message,
            http_status,
            data_tag,
            data,
        }))
    }

    pub(crate) fn ok_encode(result: EncodeResult) -> *mut Self {
        let payload = Box::new(FfiEncodeResult {
            status: c_string(&result.status),
            psnr: result.metadata.psnr,
            bits_embedded: result.metadata.bits_embedded,
            download_url: c_string(&result.download_url),
        });
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            0,
            FfiDataTag::Encode,
            Box::into_raw(payload) as *mut std::ffi::c_void,
        )
    }

    pub(crate) fn ok_decode(result: DecodeResult) -> *mut Self {
        let message = match result.message() {
            Some(m) => c_string(m),
            None => std::ptr::null_mut(),
        };
        let payload = Box::new(FfiDecodeResult {
            found: result.found,
            message,
            confidence: result.confidence,
        });
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            0,
            FfiDataTag::Decode,
            Box::into_raw(payload) as *mut std::ffi::c_void,
        )
    }

    pub(crate) fn ok_request(req: truthmark_core::HttpRequest) -> *mut Self {
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            0,
            FfiDataTag::Request,
            FfiHttpRequest::from_core(req) as *mut std::ffi::c_void,
        )
    }

    /// Success with no payload (e.g. download).
    pub(crate) fn ok_empty() -> *mut Self {
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            0,
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let (error_code, http_status) = match &err {
            ApiError::SourceNotFound { .. } => (FfiErrorCode::SourceNotFound, 0),
            ApiError::Network(_) => (FfiErrorCode::Network, 0),
            ApiError::Api { status, .. } => (FfiErrorCode::Api, *status),
            ApiError::Deserialization(_) => (FfiErrorCode::Deserialization, 0),
            ApiError::InvalidConfig(_) => (FfiErrorCode::InvalidConfig, 0),
            ApiError::Io(_) => (FfiErrorCode::Io, 0),
        };
        Self::boxed(
            error_code,
            c_string(&err.to_string()),
            http_status,
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    pub(crate) fn invalid_arg(name: &str) -> *mut Self {
        Self::failure(
            FfiErrorCode::InvalidArgument,
            &format!("argument is not valid UTF-8: {name}"),
        )
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg)
    }

    fn failure(code: FfiErrorCode, msg: &str) -> *mut Self {
        Self::boxed(
            code,
            c_string(msg),
            0,
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }
}
