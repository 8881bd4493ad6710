//! The request descriptor handed to a `RequestQueue`.
//!
//! # Design
//! A `RestRequest` is built per call and moved into the queue on `send`.
//! It carries everything needed to render the outbound `HttpRequest` plus
//! the listeners that receive the outcome. `deliver` and `fail` consume the
//! descriptor, so each request resolves exactly once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{trace, warn};
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::{AuthFailure, RestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::queue::RequestHandle;

/// Flat request parameters. Keys are unique and iterate in sorted order.
pub type Params = BTreeMap<String, String>;

pub type SuccessListener = Box<dyn FnOnce(Value) + Send>;
pub type ErrorListener = Box<dyn FnOnce(RestError) + Send>;

/// Shared listener notified when the server rejects the access token.
pub type AuthFailedListener = Arc<dyn Fn(&AuthFailure) + Send + Sync>;

/// Body error codes that mark a 403 as an auth failure.
const AUTH_ERROR_CODES: [&str; 2] = ["invalid_token", "authorization_required"];

/// Unique identifier assigned to each descriptor at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Payload attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Params),
    /// Sent as `application/json`.
    Json(Value),
}

/// Percent-encode `params` as `k1=v1&k2=v2` using the form encoding
/// (UTF-8 bytes, space as `+`).
pub fn encode_params(params: &Params) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

pub struct RestRequest {
    id: RequestId,
    method: HttpMethod,
    url: String,
    body: RequestBody,
    access_token: Option<String>,
    user_agent: Option<String>,
    on_success: SuccessListener,
    on_error: ErrorListener,
    on_auth_failed: Option<AuthFailedListener>,
}

impl RestRequest {
    pub fn new(
        method: HttpMethod,
        url: impl Into<String>,
        body: RequestBody,
        on_success: impl FnOnce(Value) + Send + 'static,
        on_error: impl FnOnce(RestError) + Send + 'static,
    ) -> Self {
        Self {
            id: RequestId::new(),
            method,
            url: url.into(),
            body,
            access_token: None,
            user_agent: None,
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
            on_auth_failed: None,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn has_auth_failed_listener(&self) -> bool {
        self.on_auth_failed.is_some()
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    pub fn set_user_agent(&mut self, user_agent: Option<String>) {
        self.user_agent = user_agent;
    }

    pub fn set_on_auth_failed_listener(&mut self, listener: AuthFailedListener) {
        self.on_auth_failed = Some(listener);
    }

    pub fn handle(&self) -> RequestHandle {
        RequestHandle {
            id: self.id,
            method: self.method,
            url: self.url.clone(),
        }
    }

    /// Render the outbound HTTP request.
    pub fn to_http(&self) -> HttpRequest {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if let Some(user_agent) = &self.user_agent {
            headers.push(("user-agent".to_string(), user_agent.clone()));
        }
        if let Some(token) = &self.access_token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        let body = match &self.body {
            RequestBody::Empty => None,
            RequestBody::Form(params) => {
                headers.push((
                    "content-type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                Some(encode_params(params))
            }
            RequestBody::Json(value) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(value.to_string())
            }
        };

        HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            body,
        }
    }

    /// Resolve the request with the response produced by the queue.
    ///
    /// Auth failures notify the auth-failure listener before the error
    /// listener.
    pub fn deliver(self, response: HttpResponse) {
        trace!(id = %self.id, status = response.status, "delivering response");

        if response.is_success() {
            if response.body.trim().is_empty() {
                (self.on_success)(Value::Null);
                return;
            }
            match serde_json::from_str(&response.body) {
                Ok(value) => (self.on_success)(value),
                Err(e) => (self.on_error)(RestError::Deserialization(e.to_string())),
            }
            return;
        }

        if let Some(failure) = auth_failure(&response) {
            warn!(
                id = %self.id,
                status = failure.status,
                code = failure.code.as_deref().unwrap_or(""),
                "authentication failed"
            );
            if let Some(listener) = &self.on_auth_failed {
                listener(&failure);
            }
            (self.on_error)(RestError::Unauthorized {
                status: response.status,
                body: response.body,
            });
            return;
        }

        (self.on_error)(RestError::Http {
            status: response.status,
            body: response.body,
        });
    }

    /// Resolve the request with an error raised by the queue itself.
    pub fn fail(self, error: RestError) {
        trace!(id = %self.id, %error, "request failed");
        (self.on_error)(error);
    }
}

impl fmt::Debug for RestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestRequest")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body", &self.body)
            .field("authenticated", &self.access_token.is_some())
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

/// Classify a non-2xx response as an auth failure.
///
/// 401 always counts. 403 counts only when the body names a token error.
fn auth_failure(response: &HttpResponse) -> Option<AuthFailure> {
    let body: Option<Value> = serde_json::from_str(&response.body).ok();
    let field = |name: &str| {
        body.as_ref()
            .and_then(|b| b.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let code = field("error");

    let is_auth = match response.status {
        401 => true,
        403 => code
            .as_deref()
            .is_some_and(|c| AUTH_ERROR_CODES.contains(&c)),
        _ => false,
    };
    is_auth.then(|| AuthFailure {
        status: response.status,
        code,
        message: field("message"),
    })
}
