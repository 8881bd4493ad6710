//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. The opaque client also owns the
//! in-process queue that parks descriptors until the host reports back.

use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rest_core::{
    HttpMethod, HttpRequest, HttpResponse, RequestHandle, RequestId, RequestQueue, RestClient,
    RestError, RestRequest,
};
use serde_json::Value;

/// Where a descriptor's listeners leave its outcome.
pub(crate) type Slot = Arc<Mutex<Option<Result<Value, RestError>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Convert an owned string into a heap-allocated C string.
///
/// Strings with interior NULs become empty rather than failing.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Queue that parks descriptors until the host executes them.
#[derive(Default)]
pub(crate) struct PendingQueue {
    pending: Mutex<HashMap<RequestId, RestRequest>>,
}

impl PendingQueue {
    fn take(&self, id: RequestId) -> Option<RestRequest> {
        lock(&self.pending).remove(&id)
    }
}

impl RequestQueue for PendingQueue {
    fn add(&self, request: RestRequest) {
        lock(&self.pending).insert(request.id(), request);
    }

    fn cancel(&self, id: RequestId) -> bool {
        match self.take(id) {
            Some(request) => {
                request.fail(RestError::Cancelled);
                true
            }
            None => false,
        }
    }
}

struct Pending {
    handle: RequestHandle,
    slot: Slot,
}

/// Opaque handle to a `RestClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiRestClient {
    pub(crate) inner: RestClient,
    queue: Arc<PendingQueue>,
    pending: Mutex<HashMap<RequestId, Pending>>,
}

impl FfiRestClient {
    pub(crate) fn new(build: impl FnOnce(Arc<dyn RequestQueue>) -> RestClient) -> Self {
        let queue = Arc::new(PendingQueue::default());
        let shared: Arc<dyn RequestQueue> = queue.clone();
        Self {
            inner: build(shared),
            queue,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh outcome slot plus listeners that fill it.
    pub(crate) fn listeners() -> (
        Slot,
        impl FnOnce(Value) + Send + 'static,
        impl FnOnce(RestError) + Send + 'static,
    ) {
        let slot: Slot = Arc::new(Mutex::new(None));
        let ok = Arc::clone(&slot);
        let err = Arc::clone(&slot);
        (
            slot,
            move |value: Value| *lock(&ok) = Some(Ok(value)),
            move |error: RestError| *lock(&err) = Some(Err(error)),
        )
    }

    /// Park `request` in the queue and render it for the host.
    pub(crate) fn submit(&self, request: RestRequest, slot: Slot) -> *mut FfiHttpRequest {
        let http = request.to_http();
        let handle = self.inner.send(request);
        let id = handle.id;
        lock(&self.pending).insert(id, Pending { handle, slot });
        FfiHttpRequest::from_core(id, http)
    }

    /// Deliver the host's response. `None` if `id` is not pending.
    pub(crate) fn complete(
        &self,
        id: RequestId,
        response: HttpResponse,
    ) -> Option<Result<Value, RestError>> {
        let pending = lock(&self.pending).remove(&id)?;
        let request = self.queue.take(id)?;
        request.deliver(response);
        let outcome = lock(&pending.slot).take();
        outcome
    }

    pub(crate) fn cancel(&self, id: RequestId) -> bool {
        match lock(&self.pending).remove(&id) {
            Some(pending) => self.inner.cancel(&pending.handle),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
    Patch = 4,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
            HttpMethod::Patch => FfiHttpMethod::Patch,
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
/// `id` identifies the parked descriptor; pass it to `rest_client_complete`
/// together with the response once the host has executed the request.
#[repr(C)]
pub struct FfiHttpRequest {
    pub id: *mut c_char,
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a rendered `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(id: RequestId, req: HttpRequest) -> *mut Self {
        let body = match req.body {
            Some(b) => into_c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            id: into_c_string(id.to_string()),
            method: req.method.into(),
            url: into_c_string(req.url),
            headers,
            headers_len,
            body,
        }))
    }
}

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request.
/// The FFI layer reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Outcome codes returned in `FfiRestResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiResultCode {
    Ok = 0,
    AuthFailed = 1,
    Http = 2,
    Deserialization = 3,
    Transport = 4,
    Cancelled = 5,
    UnknownRequest = 6,
    Panic = 7,
    NullArg = 8,
}

/// Result envelope for `rest_client_complete`.
///
/// On success `code` is `Ok` and `json` holds the response document as text
/// (`null` for an empty body). On failure `json` is null and `error_message`
/// is a human-readable C string.
#[repr(C)]
pub struct FfiRestResult {
    pub code: FfiResultCode,
    pub http_status: u16,
    pub json: *mut c_char,
    pub error_message: *mut c_char,
}

impl FfiRestResult {
    fn boxed(
        code: FfiResultCode,
        http_status: u16,
        json: *mut c_char,
        msg: *mut c_char,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiRestResult {
            code,
            http_status,
            json,
            error_message: msg,
        }))
    }

    pub(crate) fn ok(value: Value, status: u16) -> *mut Self {
        Self::boxed(
            FfiResultCode::Ok,
            status,
            into_c_string(value.to_string()),
            std::ptr::null_mut(),
        )
    }

    pub(crate) fn from_error(err: RestError) -> *mut Self {
        let code = match &err {
            RestError::Unauthorized { .. } => FfiResultCode::AuthFailed,
            RestError::Http { .. } => FfiResultCode::Http,
            RestError::Deserialization(_) => FfiResultCode::Deserialization,
            RestError::Transport(_) => FfiResultCode::Transport,
            RestError::Cancelled => FfiResultCode::Cancelled,
        };
        let status = err.status().unwrap_or(0);
        Self::boxed(code, status, std::ptr::null_mut(), into_c_string(err.to_string()))
    }

    pub(crate) fn failure(code: FfiResultCode, msg: String) -> *mut Self {
        Self::boxed(code, 0, std::ptr::null_mut(), into_c_string(msg))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiResultCode::NullArg, format!("null argument: {name}"))
    }
}
