//! End-to-end test against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then sends descriptors through a
//! `RequestQueue` that executes each one on its own thread with ureq. Outcomes
//! arrive asynchronously over channels, the way an app would observe them.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use rest_core::{
    AuthFailure, HttpMethod, HttpResponse, Params, RequestQueue, RestClient, RestError,
    RestRequest,
};
use serde_json::{json, Value};

const WAIT: Duration = Duration::from_secs(10);

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

/// Executes every request on a fresh thread.
///
/// Disables ureq's status-code-as-error behavior so 4xx/5xx responses are
/// delivered as data and classified by the descriptor itself.
struct ThreadQueue {
    agent: ureq::Agent,
}

impl ThreadQueue {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl RequestQueue for ThreadQueue {
    fn add(&self, request: RestRequest) {
        let agent = self.agent.clone();
        std::thread::spawn(move || {
            let req = request.to_http();
            let result = match (req.method, req.body) {
                (HttpMethod::Get, _) => with_headers(agent.get(&req.url), &req.headers).call(),
                (HttpMethod::Delete, _) => {
                    with_headers(agent.delete(&req.url), &req.headers).call()
                }
                (HttpMethod::Post, body) => with_headers(agent.post(&req.url), &req.headers)
                    .send(body.unwrap_or_default().as_bytes()),
                (HttpMethod::Put, body) => with_headers(agent.put(&req.url), &req.headers)
                    .send(body.unwrap_or_default().as_bytes()),
                (HttpMethod::Patch, body) => with_headers(agent.patch(&req.url), &req.headers)
                    .send(body.unwrap_or_default().as_bytes()),
            };

            match result {
                Ok(mut response) => {
                    let status = response.status().as_u16();
                    let body = response.body_mut().read_to_string().unwrap_or_default();
                    request.deliver(HttpResponse {
                        status,
                        headers: Vec::new(),
                        body,
                    });
                }
                Err(e) => request.fail(RestError::Transport(e.to_string())),
            }
        });
    }
}

type Outcome = Result<Value, RestError>;

fn listeners(
    tx: &Sender<Outcome>,
) -> (
    impl FnOnce(Value) + Send + 'static,
    impl FnOnce(RestError) + Send + 'static,
) {
    let ok = tx.clone();
    let err = tx.clone();
    (
        move |v: Value| {
            let _ = ok.send(Ok(v));
        },
        move |e: RestError| {
            let _ = err.send(Err(e));
        },
    )
}

fn get(client: &RestClient, path: &str, rx: &Receiver<Outcome>, tx: &Sender<Outcome>) -> Outcome {
    let (ok, err) = listeners(tx);
    client.send(client.get(path, ok, err));
    rx.recv_timeout(WAIT).expect("no outcome delivered")
}

fn start_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

#[test]
fn request_lifecycle() {
    let addr = start_server();
    let endpoint = format!("http://{addr}/rest/v1/");
    let mut client = RestClient::with_endpoint(Arc::new(ThreadQueue::new()), None, &endpoint);
    assert_eq!(client.endpoint_url(), endpoint);

    let (auth_tx, auth_rx) = mpsc::channel::<AuthFailure>();
    client.set_on_auth_failed_listener(Arc::new(move |failure: &AuthFailure| {
        let _ = auth_tx.send(failure.clone());
    }));
    let (tx, rx) = mpsc::channel::<Outcome>();

    // Step 1: no token: auth listener fires, then the error listener.
    let outcome = get(&client, "/me", &rx, &tx);
    assert!(matches!(outcome, Err(RestError::Unauthorized { status: 401, .. })));
    let failure = auth_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(failure.code.as_deref(), Some("authorization_required"));

    // Step 2: stale token: 403 invalid_token is also an auth failure.
    client.set_access_token("stale");
    let outcome = get(&client, "me", &rx, &tx);
    assert!(matches!(outcome, Err(RestError::Unauthorized { status: 403, .. })));
    assert_eq!(
        auth_rx.recv_timeout(WAIT).unwrap().code.as_deref(),
        Some("invalid_token")
    );

    // Step 3: valid token.
    client.set_access_token(mock_server::VALID_TOKEN);
    assert!(client.is_authenticated());
    let me = get(&client, "me", &rx, &tx).unwrap();
    assert_eq!(me["ID"], 1);
    assert_eq!(me["username"], "plutonem");

    // Step 4: create two posts with form bodies that need encoding.
    for title in ["Hello world", "café & co"] {
        let mut params = Params::new();
        params.insert("title".to_string(), title.to_string());
        params.insert("content".to_string(), "a=b".to_string());
        let (ok, err) = listeners(&tx);
        client.send(client.post("/sites/5/posts/new", params, ok, err));
        let post = rx.recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(post["title"], title);
        assert_eq!(post["content"], "a=b");
        assert_eq!(post["site_id"], 5);
    }

    // Step 5: list with a query string.
    let mut query = Params::new();
    query.insert("number".to_string(), "1".to_string());
    let url = client.absolute_url_with_params("sites/5/posts", &query);
    assert_eq!(url, format!("{endpoint}sites/5/posts?number=1"));
    let (ok, err) = listeners(&tx);
    client.send(client.make_request(HttpMethod::Get, &url, None, ok, err));
    let listing = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(listing["found"], 2);
    assert_eq!(listing["posts"].as_array().unwrap().len(), 1);

    // Step 6: JSON body with a user agent.
    client.set_user_agent("plutonem-test/1.0");
    let (ok, err) = listeners(&tx);
    let payload = json!({"content": "hello", "tags": ["a", "b"]});
    client.send(client.make_json_request(&client.absolute_url("echo"), payload.clone(), ok, err));
    let echoed = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(echoed["version"], "v1");
    assert_eq!(echoed["user_agent"], "plutonem-test/1.0");
    assert_eq!(echoed["body"], payload);

    // Step 7: unknown route: plain HTTP error, no auth notification.
    let outcome = get(&client, "nope", &rx, &tx);
    assert!(matches!(outcome, Err(RestError::Http { status: 404, .. })));
    assert!(auth_rx.try_recv().is_err());
}

#[test]
fn transport_failure_reaches_error_listener() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = RestClient::with_endpoint(
        Arc::new(ThreadQueue::new()),
        None,
        format!("http://{addr}/rest/v1/"),
    );
    let (tx, rx) = mpsc::channel::<Outcome>();

    let outcome = get(&client, "me", &rx, &tx);
    assert!(matches!(outcome, Err(RestError::Transport(_))));
}
