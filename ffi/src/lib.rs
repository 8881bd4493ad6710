//! C-ABI wrapper around `rest-core`.
//!
//! # Overview
//! Lets any language with a C FFI build REST request descriptors, execute
//! them with its own HTTP stack, and hand the responses back for outcome
//! classification (success, error, auth failure).
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `rest_client_get` / `rest_client_post*` build a descriptor, park it in
//!   the client's pending queue, and return the rendered `FfiHttpRequest`
//!   with the descriptor's id. `rest_client_complete` resolves it.
//! - The C caller owns all returned pointers and must call the matching
//!   `rest_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rest_core::{ApiVersion, HttpResponse, Params, RequestId, RestClient};
use tracing::debug;

use types::*;

/// Borrow a C string as `&str`. Null or invalid UTF-8 yields `None`.
unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn parse_id(id: *const c_char) -> Option<RequestId> {
    let id = unsafe { borrow_str(id) }?;
    uuid::Uuid::parse_str(id).ok().map(RequestId::from)
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client for the endpoint version `version_code`
/// (0 = v0, 1 = v1, 2 = v1.1, 3 = v1.2, 4 = v1.3). Unknown codes select v1.
///
/// The caller must free the returned pointer with `rest_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_new(version_code: u32) -> *mut FfiRestClient {
    catch_unwind(|| {
        let version = ApiVersion::from_code(version_code);
        let client = FfiRestClient::new(|queue| RestClient::with_version(queue, version));
        Box::into_raw(Box::new(client))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a client with an explicit endpoint URL. `token` may be null.
///
/// Returns null if `endpoint_url` is null or not valid UTF-8.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_new_with_endpoint(
    token: *const c_char,
    endpoint_url: *const c_char,
) -> *mut FfiRestClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { borrow_str(endpoint_url) }) else {
            return std::ptr::null_mut();
        };
        let token = unsafe { borrow_str(token) }.map(str::to_string);
        let client = FfiRestClient::new(|queue| RestClient::with_endpoint(queue, token, url));
        Box::into_raw(Box::new(client))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client. Pending requests are dropped without notification.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_free(client: *mut FfiRestClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Client state
// ---------------------------------------------------------------------------

/// Set the bearer token for future requests. A null `token` clears it.
/// Returns false if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_access_token(
    client: *mut FfiRestClient,
    token: *const c_char,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        match unsafe { borrow_str(token) } {
            Some(token) => client.inner.set_access_token(token),
            None => client.inner.clear_access_token(),
        }
        true
    }))
    .unwrap_or(false)
}

/// Set the User-Agent for future requests.
/// Returns false if either argument is null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_set_user_agent(
    client: *mut FfiRestClient,
    user_agent: *const c_char,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        match unsafe { borrow_str(user_agent) } {
            Some(user_agent) => {
                client.inner.set_user_agent(user_agent);
                true
            }
            None => false,
        }
    }))
    .unwrap_or(false)
}

#[unsafe(no_mangle)]
pub extern "C" fn rest_client_is_authenticated(client: *const FfiRestClient) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        !client.is_null() && unsafe { &*client }.inner.is_authenticated()
    }))
    .unwrap_or(false)
}

/// The active endpoint URL. Free with `rest_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_endpoint_url(client: *const FfiRestClient) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        into_c_string(client.inner.endpoint_url().to_string())
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Resolve `path` against the endpoint URL. Free with `rest_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_absolute_url(
    client: *const FfiRestClient,
    path: *const c_char,
) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match unsafe { borrow_str(path) } {
            Some(path) => into_c_string(client.inner.absolute_url(path)),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build requests
// ---------------------------------------------------------------------------

/// Build a GET for `path` and park it until `rest_client_complete`.
///
/// Returns null if `client` or `path` is null.
/// The caller must free the returned pointer with `rest_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_get(
    client: *const FfiRestClient,
    path: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(path) = (unsafe { borrow_str(path) }) else {
            return std::ptr::null_mut();
        };
        let (slot, ok, err) = FfiRestClient::listeners();
        let request = client.inner.get(path, ok, err);
        client.submit(request, slot)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Build a form-encoded POST. `keys` and `values` are parallel arrays of
/// `len` C strings; a later duplicate key replaces an earlier one.
///
/// Returns null if any pointer is null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_post(
    client: *const FfiRestClient,
    path: *const c_char,
    keys: *const *const c_char,
    values: *const *const c_char,
    len: u32,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() || (len > 0 && (keys.is_null() || values.is_null())) {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(path) = (unsafe { borrow_str(path) }) else {
            return std::ptr::null_mut();
        };

        let mut params = Params::new();
        for i in 0..len as usize {
            let (key, value) = unsafe { (*keys.add(i), *values.add(i)) };
            let (Some(key), Some(value)) =
                (unsafe { borrow_str(key) }, unsafe { borrow_str(value) })
            else {
                return std::ptr::null_mut();
            };
            params.insert(key.to_string(), value.to_string());
        }

        let (slot, ok, err) = FfiRestClient::listeners();
        let request = client.inner.post(path, params, ok, err);
        client.submit(request, slot)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Build a POST whose body is the JSON document `json`.
///
/// Returns null if any pointer is null or `json` does not parse.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_post_json(
    client: *const FfiRestClient,
    path: *const c_char,
    json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let (Some(path), Some(json)) = (unsafe { borrow_str(path) }, unsafe { borrow_str(json) })
        else {
            return std::ptr::null_mut();
        };
        let Ok(params) = serde_json::from_str(json) else {
            return std::ptr::null_mut();
        };

        let (slot, ok, err) = FfiRestClient::listeners();
        let url = client.inner.absolute_url(path);
        let request = client.inner.make_json_request(&url, params, ok, err);
        client.submit(request, slot)
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Complete / cancel
// ---------------------------------------------------------------------------

/// Deliver the host's response for request `id`.
///
/// Returns a result whose `code` is `Ok` (with `json`), `AuthFailed`, or
/// another error category. The caller must free it with `rest_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_complete(
    client: *const FfiRestClient,
    id: *const c_char,
    response: *const FfiHttpResponse,
) -> *mut FfiRestResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiRestResult::null_arg("client");
        }
        if response.is_null() {
            return FfiRestResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        let Some(request_id) = parse_id(id) else {
            return FfiRestResult::failure(
                FfiResultCode::UnknownRequest,
                "invalid request id".to_string(),
            );
        };
        let status = resp.status;
        let body = unsafe { borrow_str(resp.body) }.unwrap_or("").to_string();

        debug!(id = %request_id, status, "completing request");
        match client.complete(
            request_id,
            HttpResponse {
                status,
                headers: Vec::new(),
                body,
            },
        ) {
            Some(Ok(value)) => FfiRestResult::ok(value, status),
            Some(Err(e)) => FfiRestResult::from_error(e),
            None => FfiRestResult::failure(
                FfiResultCode::UnknownRequest,
                format!("no pending request {request_id}"),
            ),
        }
    }))
    .unwrap_or_else(|_| {
        FfiRestResult::failure(
            FfiResultCode::Panic,
            "panic in rest_client_complete".to_string(),
        )
    })
}

/// Cancel a pending request. Returns true if it was still pending.
#[unsafe(no_mangle)]
pub extern "C" fn rest_client_cancel(client: *const FfiRestClient, id: *const c_char) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &*client };
        parse_id(id).is_some_and(|id| client.cancel(id))
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| drop(unsafe { CString::from_raw(s) }));
    }
}

/// Free an `FfiHttpRequest`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        rest_free_string(req.id);
        rest_free_string(req.url);
        rest_free_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                rest_free_string(h.key);
                rest_free_string(h.value);
            }
        }
    });
}

/// Free an `FfiRestResult`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rest_free_result(result: *mut FfiRestResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        rest_free_string(result.json);
        rest_free_string(result.error_message);
    });
}
