//! The seam to the external asynchronous request executor.
//!
//! # Design
//! The crate ships no executor. A queue implementation takes ownership of
//! each `RestRequest`, renders it with `to_http`, performs the round-trip on
//! its own schedule, and resolves it with `deliver` or `fail`. Because the
//! descriptor moves into the queue, callers keep a `RequestHandle` for
//! reference and cancellation.

use crate::http::HttpMethod;
use crate::request::{RequestId, RestRequest};

/// An external executor for `RestRequest` descriptors.
pub trait RequestQueue: Send + Sync {
    /// Enqueue `request` for asynchronous execution.
    fn add(&self, request: RestRequest);

    /// Ask the queue to drop a pending request. Returns `true` if the
    /// request was still pending and has been cancelled.
    fn cancel(&self, _id: RequestId) -> bool {
        false
    }
}

/// Lightweight reference to a request that has been sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandle {
    pub id: RequestId,
    pub method: HttpMethod,
    pub url: String,
}
