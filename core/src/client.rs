//! Request builder for the versioned REST API.
//!
//! # Design
//! `RestClient` holds a shared reference to the external `RequestQueue` and a
//! `ClientConfig`. Every builder method snapshots the config into the new
//! `RestRequest`, so later setter calls never affect descriptors that already
//! exist. Setters take `&mut self`; callers that share a client across
//! threads wrap it in their own lock.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::endpoint::ApiVersion;
use crate::error::RestError;
use crate::http::HttpMethod;
use crate::queue::{RequestHandle, RequestQueue};
use crate::request::{encode_params, AuthFailedListener, Params, RequestBody, RestRequest};
use crate::settings::ClientSettings;

/// Mutable per-client state read by every new request.
#[derive(Clone, Default)]
pub struct ClientConfig {
    pub access_token: Option<String>,
    pub user_agent: Option<String>,
    pub endpoint_url: String,
    pub on_auth_failed: Option<AuthFailedListener>,
}

impl ClientConfig {
    pub fn for_version(version: ApiVersion) -> Self {
        Self {
            endpoint_url: version.base_url().to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("authenticated", &self.access_token.is_some())
            .field("user_agent", &self.user_agent)
            .field("endpoint_url", &self.endpoint_url)
            .field("on_auth_failed", &self.on_auth_failed.is_some())
            .finish()
    }
}

/// Builds `RestRequest` descriptors and submits them to a `RequestQueue`.
#[derive(Clone)]
pub struct RestClient {
    queue: Arc<dyn RequestQueue>,
    config: ClientConfig,
}

impl RestClient {
    /// Client targeting the `V1` endpoint.
    pub fn new(queue: Arc<dyn RequestQueue>) -> Self {
        Self::with_version(queue, ApiVersion::V1)
    }

    pub fn with_version(queue: Arc<dyn RequestQueue>, version: ApiVersion) -> Self {
        Self {
            queue,
            config: ClientConfig::for_version(version),
        }
    }

    /// Client with an explicit token and endpoint URL, bypassing the
    /// version table.
    pub fn with_endpoint(
        queue: Arc<dyn RequestQueue>,
        token: Option<String>,
        endpoint_url: impl Into<String>,
    ) -> Self {
        let mut client = Self::new(queue);
        client.config.access_token = token;
        client.config.endpoint_url = endpoint_url.into();
        client
    }

    pub fn from_settings(queue: Arc<dyn RequestQueue>, settings: &ClientSettings) -> Self {
        let mut client = Self::with_version(queue, settings.version);
        client.config.endpoint_url = settings.endpoint().to_string();
        client.config.access_token = settings.access_token.clone();
        client.config.user_agent = settings.user_agent.clone();
        client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoint_url(&self) -> &str {
        &self.config.endpoint_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.config.access_token.is_some()
    }

    /// Sets the User-Agent header sent with each future request.
    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) {
        self.config.user_agent = Some(user_agent.into());
    }

    /// Sets the bearer token sent with each future request.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.config.access_token = Some(token.into());
    }

    pub fn clear_access_token(&mut self) {
        self.config.access_token = None;
    }

    pub fn set_on_auth_failed_listener(&mut self, listener: AuthFailedListener) {
        self.config.on_auth_failed = Some(listener);
    }

    pub fn get(
        &self,
        path: &str,
        on_success: impl FnOnce(Value) + Send + 'static,
        on_error: impl FnOnce(RestError) + Send + 'static,
    ) -> RestRequest {
        self.make_request(HttpMethod::Get, &self.absolute_url(path), None, on_success, on_error)
    }

    /// Build a POST with `params` as a form-encoded body.
    pub fn post(
        &self,
        path: &str,
        params: Params,
        on_success: impl FnOnce(Value) + Send + 'static,
        on_error: impl FnOnce(RestError) + Send + 'static,
    ) -> RestRequest {
        self.make_request(
            HttpMethod::Post,
            &self.absolute_url(path),
            Some(params),
            on_success,
            on_error,
        )
    }

    /// Build a request for an already absolute `url`.
    ///
    /// For `GET`, `params` are appended to the query string;
    /// for every other method they become a form body.
    pub fn make_request(
        &self,
        method: HttpMethod,
        url: &str,
        params: Option<Params>,
        on_success: impl FnOnce(Value) + Send + 'static,
        on_error: impl FnOnce(RestError) + Send + 'static,
    ) -> RestRequest {
        let (url, body) = match (method, params) {
            (_, None) => (url.to_string(), RequestBody::Empty),
            (HttpMethod::Get, Some(params)) => (append_query(url, &params), RequestBody::Empty),
            (_, Some(params)) => (url.to_string(), RequestBody::Form(params)),
        };
        let request = RestRequest::new(method, url, body, on_success, on_error);
        self.prepare(request)
    }

    /// Build a `POST` whose body is the JSON document `params`.
    pub fn make_json_request(
        &self,
        url: &str,
        params: Value,
        on_success: impl FnOnce(Value) + Send + 'static,
        on_error: impl FnOnce(RestError) + Send + 'static,
    ) -> RestRequest {
        let request = RestRequest::new(
            HttpMethod::Post,
            url,
            RequestBody::Json(params),
            on_success,
            on_error,
        );
        self.prepare(request)
    }

    /// Hand `request` to the queue. The returned handle identifies it for
    /// cancellation.
    pub fn send(&self, request: RestRequest) -> RequestHandle {
        let handle = request.handle();
        debug!(id = %handle.id, method = %handle.method, url = %handle.url, "sending request");
        self.queue.add(request);
        handle
    }

    pub fn cancel(&self, handle: &RequestHandle) -> bool {
        let cancelled = self.queue.cancel(handle.id);
        debug!(id = %handle.id, cancelled, "cancel requested");
        cancelled
    }

    /// Resolve `path` against the endpoint URL.
    ///
    /// Paths that already start with the endpoint pass through unchanged.
    /// Otherwise one leading `/` is dropped and the endpoint is prepended.
    pub fn absolute_url(&self, path: &str) -> String {
        let endpoint = &self.config.endpoint_url;
        if path.starts_with(endpoint.as_str()) {
            return path.to_string();
        }
        let relative = path.strip_prefix('/').unwrap_or(path);
        format!("{endpoint}{relative}")
    }

    /// `absolute_url` followed by the encoded `params` as a query string.
    pub fn absolute_url_with_params(&self, path: &str, params: &Params) -> String {
        append_query(&self.absolute_url(path), params)
    }

    fn prepare(&self, mut request: RestRequest) -> RestRequest {
        if let Some(listener) = &self.config.on_auth_failed {
            request.set_on_auth_failed_listener(Arc::clone(listener));
        }
        request.set_user_agent(self.config.user_agent.clone());
        request.set_access_token(self.config.access_token.clone());
        debug!(
            id = %request.id(),
            method = %request.method(),
            url = request.url(),
            "built request"
        );
        request
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Append `params` to `url`, using `&` if a query is already present.
///
/// The separator is written even for an empty map, so `sites/1` becomes
/// `sites/1?` and `sites/1?x=1` becomes `sites/1?x=1&`.
fn append_query(url: &str, params: &Params) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{}", encode_params(params))
}
