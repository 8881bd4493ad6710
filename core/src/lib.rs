//! Request builder core for the versioned Plutonem REST API.
//!
//! # Overview
//! Builds `RestRequest` descriptors (absolute URL, method, parameters, auth
//! token, user agent, outcome listeners) and hands them to an external
//! `RequestQueue` for execution. The crate never touches the network: the
//! queue renders each descriptor with `RestRequest::to_http`, performs the
//! round-trip, and calls `RestRequest::deliver` with the response.
//!
//! # Design
//! - `RestClient` owns a `ClientConfig` (token, user agent, endpoint URL,
//!   auth-failure listener). Every new descriptor snapshots it at creation.
//! - Endpoint versions are a fixed lookup table in `endpoint`.
//! - Outcomes are three-way: success, error, and auth failure. The
//!   auth-failure listener fires before the error listener.
//! - Transport types use owned `String` / `Vec` fields so they map cleanly
//!   onto the C ABI in `rest-ffi`.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod queue;
pub mod request;
pub mod settings;

pub use client::{ClientConfig, RestClient};
pub use endpoint::ApiVersion;
pub use error::{AuthFailure, RestError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use queue::{RequestHandle, RequestQueue};
pub use request::{AuthFailedListener, Params, RequestBody, RequestId, RestRequest};
pub use settings::ClientSettings;
