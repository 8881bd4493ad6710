//! Verify URL building, request rendering, and outcome delivery against the
//! JSON test vectors stored in `test-vectors/`.
//!
//! Bodies are compared as parsed JSON where they are JSON, so field ordering
//! never causes false negatives.

use std::sync::{Arc, Mutex};

use rest_core::{
    AuthFailure, HttpMethod, HttpResponse, Params, RequestQueue, RestClient, RestError, RestRequest,
};
use serde_json::Value;

const BASE_URL: &str = "http://host/rest/v1/";

struct NullQueue;

impl RequestQueue for NullQueue {
    fn add(&self, _request: RestRequest) {}
}

fn client(endpoint: &str) -> RestClient {
    RestClient::with_endpoint(Arc::new(NullQueue), None, endpoint)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        "PATCH" => HttpMethod::Patch,
        other => panic!("unknown method: {other}"),
    }
}

fn params(value: &Value) -> Option<Params> {
    value
        .as_object()
        .map(|_| serde_json::from_value(value.clone()).unwrap())
}

// ---------------------------------------------------------------------------
// Absolute URLs
// ---------------------------------------------------------------------------

#[test]
fn absolute_url_test_vectors() {
    let raw = include_str!("../../test-vectors/absolute_url.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let c = client(case["endpoint"].as_str().unwrap());
        let path = case["path"].as_str().unwrap();
        let expected = case["expected"].as_str().unwrap();

        let params = params(&case["params"]);
        let url = match &params {
            Some(params) => c.absolute_url_with_params(path, params),
            None => c.absolute_url(path),
        };
        assert_eq!(url, expected, "{name}: url");

        if params.is_none() {
            assert_eq!(c.absolute_url(&url), url, "{name}: idempotent");
        } else if params.is_some_and(|p| !p.is_empty()) {
            assert_eq!(url.matches('?').count(), 1, "{name}: one '?'");
            assert!(!url.ends_with('&'), "{name}: no trailing '&'");
            assert!(!url.contains("&&"), "{name}: no empty pair");
        }
    }
}

// ---------------------------------------------------------------------------
// Request rendering
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/request.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut c = client(BASE_URL);
        if let Some(token) = case["access_token"].as_str() {
            c.set_access_token(token);
        }
        if let Some(agent) = case["user_agent"].as_str() {
            c.set_user_agent(agent);
        }

        let method = parse_method(case["method"].as_str().unwrap());
        let path = case["path"].as_str().unwrap();
        let req = if !case["json"].is_null() {
            c.make_json_request(&c.absolute_url(path), case["json"].clone(), |_| {}, |_| {})
        } else {
            let params = params(&case["params"]);
            c.make_request(method, &c.absolute_url(path), params, |_| {}, |_| {})
        };
        let http = req.to_http();
        let expected = &case["expected_request"];

        assert_eq!(
            http.method,
            parse_method(expected["method"].as_str().unwrap()),
            "{name}: method"
        );
        assert_eq!(http.url, expected["url"].as_str().unwrap(), "{name}: url");

        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(http.headers, expected_headers, "{name}: headers");

        if let Some(json_body) = expected.get("json_body") {
            let sent: Value = serde_json::from_str(http.body.as_deref().unwrap()).unwrap();
            assert_eq!(&sent, json_body, "{name}: json body");
        } else {
            assert_eq!(http.body.as_deref(), expected["body"].as_str(), "{name}: body");
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome delivery
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Seen {
    success: bool,
    auth_failed: bool,
    error: Option<RestError>,
}

#[test]
fn outcome_test_vectors() {
    let raw = include_str!("../../test-vectors/outcome.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let seen = Arc::new(Mutex::new(Seen::default()));

        let mut c = client(BASE_URL);
        let auth = Arc::clone(&seen);
        c.set_on_auth_failed_listener(Arc::new(move |_: &AuthFailure| {
            auth.lock().unwrap().auth_failed = true;
        }));
        let ok = Arc::clone(&seen);
        let err = Arc::clone(&seen);
        let req = c.get(
            "me",
            move |_| ok.lock().unwrap().success = true,
            move |e| err.lock().unwrap().error = Some(e),
        );

        req.deliver(HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        });

        let seen = seen.lock().unwrap();
        match case["expected"].as_str().unwrap() {
            "success" => {
                assert!(seen.success, "{name}: expected success");
                assert!(seen.error.is_none(), "{name}: unexpected error");
            }
            "auth_failed" => {
                assert!(seen.auth_failed, "{name}: expected auth listener");
                assert!(
                    matches!(seen.error, Some(RestError::Unauthorized { .. })),
                    "{name}: expected Unauthorized"
                );
            }
            "error" => {
                assert!(!seen.success && !seen.auth_failed, "{name}: only error listener");
                let error = seen.error.as_ref().unwrap();
                match case["expected_error"].as_str().unwrap() {
                    "Http" => assert!(
                        matches!(error, RestError::Http { .. }),
                        "{name}: expected Http"
                    ),
                    "Deserialization" => assert!(
                        matches!(error, RestError::Deserialization(_)),
                        "{name}: expected Deserialization"
                    ),
                    other => panic!("{name}: unknown expected_error: {other}"),
                }
            }
            other => panic!("{name}: unknown expectation: {other}"),
        }
    }
}
