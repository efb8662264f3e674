//! Integration test: boots an in-process axum server that simulates the
//! gateway (and the IP lookup service), points a real [`GatewayClient`] at
//! it, and asserts the full workflow:
//!
//! - resolve → register → start-session → ping happen in order
//! - every gateway request carries the startup bearer token; the IP lookup
//!   carries none
//! - a non-2xx response aborts before any subsequent step
//! - a malformed IP lookup body fails before registration
//! - the keep-alive loop sends one ping per interval
//! - a termination signal exits the loop and sends one best-effort
//!   stop-session (whose failure is not fatal)

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use nodekeeper::config::Config;
use nodekeeper::credentials::Credentials;
use nodekeeper::error::Error;
use nodekeeper::gateway::client::GatewayClient;
use nodekeeper::runner::Runner;

// ── Mini gateway: in-process HTTP server ────────────────────────────────

/// One captured request: the path hit and its Authorization header.
#[derive(Debug, Clone)]
struct Call {
    path: String,
    auth: Option<String>,
}

#[derive(Clone)]
struct TestGateway {
    calls: Arc<Mutex<Vec<Call>>>,
    register_status: u16,
    start_status: u16,
    stop_status: u16,
    ping_status: u16,
    malformed_ip: bool,
}

impl TestGateway {
    fn ok() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            register_status: 200,
            start_status: 200,
            stop_status: 200,
            ping_status: 200,
            malformed_ip: false,
        }
    }

    fn record(&self, path: impl Into<String>, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        self.calls.lock().unwrap().push(Call {
            path: path.into(),
            auth,
        });
    }

    fn paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.path.clone())
            .collect()
    }

    fn ping_count(&self) -> usize {
        self.paths().iter().filter(|p| p.ends_with("/ping")).count()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/ip", get(ip_lookup))
            .route("/nodes/:id", post(register))
            .route("/nodes/:id/start-session", post(start_session))
            .route("/nodes/:id/stop-session", post(stop_session))
            .route("/nodes/:id/ping", post(ping))
            .with_state(self.clone())
    }
}

fn respond(status: u16, body: serde_json::Value) -> Response {
    (StatusCode::from_u16(status).unwrap(), Json(body)).into_response()
}

async fn ip_lookup(State(gw): State<TestGateway>, headers: HeaderMap) -> Response {
    gw.record("GET /ip", &headers);
    if gw.malformed_ip {
        "definitely not json".into_response()
    } else {
        Json(json!({ "ip": "203.0.113.7" })).into_response()
    }
}

async fn register(
    State(gw): State<TestGateway>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    gw.record(format!("POST /nodes/{id}"), &headers);
    respond(gw.register_status, json!({ "ok": true, "nodeId": id }))
}

async fn start_session(
    State(gw): State<TestGateway>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    gw.record(format!("POST /nodes/{id}/start-session"), &headers);
    respond(gw.start_status, json!({ "status": "started", "nodeId": id }))
}

async fn stop_session(
    State(gw): State<TestGateway>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    gw.record(format!("POST /nodes/{id}/stop-session"), &headers);
    respond(gw.stop_status, json!({ "status": "stopped", "nodeId": id }))
}

async fn ping(
    State(gw): State<TestGateway>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    gw.record(format!("POST /nodes/{id}/ping"), &headers);
    respond(
        gw.ping_status,
        json!({
            "_id": "rec-1",
            "nodeId": id,
            "pings": [{ "timestamp": chrono::Utc::now().to_rfc3339() }]
        }),
    )
}

/// Boot the mini gateway on an ephemeral port.
async fn serve(gw: &TestGateway) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = gw.router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// ── Test fixtures ───────────────────────────────────────────────────────

fn test_config(addr: SocketAddr, interval_secs: u64) -> Config {
    let mut config = Config::default();
    config.gateway.base_url = format!("http://{addr}");
    config.ip_lookup.url = format!("http://{addr}/ip");
    config.gateway.timeout_secs = 5;
    config.keepalive.ping_interval_secs = interval_secs;
    config
}

fn test_credentials() -> Credentials {
    Credentials {
        node_id: "node-1".into(),
        hardware_id: "hw-1".into(),
        token: "tok-123".into(),
    }
}

fn test_runner(config: &Config) -> Runner {
    let client = GatewayClient::new(config, &test_credentials(), None).unwrap();
    Runner::new(client, &config.keepalive)
}

/// Poll the captured calls until `pred` holds or a 5s deadline passes.
async fn wait_for(gw: &TestGateway, what: &str, pred: impl Fn(&TestGateway) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if pred(gw) {
            return;
        }
        if Instant::now() > deadline {
            panic!("deadline waiting for {what}; calls: {:?}", gw.paths());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_workflow_then_graceful_stop() {
    let gw = TestGateway::ok();
    let addr = serve(&gw).await;
    let runner = test_runner(&test_config(addr, 60));

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { runner.run(shutdown).await }
    });

    wait_for(&gw, "initial ping", |gw| gw.ping_count() >= 1).await;
    shutdown.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(
        gw.paths(),
        vec![
            "GET /ip",
            "POST /nodes/node-1",
            "POST /nodes/node-1/start-session",
            "POST /nodes/node-1/ping",
            "POST /nodes/node-1/stop-session",
        ]
    );

    // Every gateway request carries the startup bearer token; the IP
    // lookup carries none.
    for call in gw.calls.lock().unwrap().iter() {
        if call.path == "GET /ip" {
            assert_eq!(call.auth, None, "{}", call.path);
        } else {
            assert_eq!(call.auth.as_deref(), Some("Bearer tok-123"), "{}", call.path);
        }
    }
}

#[tokio::test]
async fn failed_registration_aborts_workflow() {
    let mut gw = TestGateway::ok();
    gw.register_status = 500;
    let addr = serve(&gw).await;
    let runner = test_runner(&test_config(addr, 60));

    let err = runner.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Gateway(_)), "{err}");

    // No start-session, ping, or stop-session was ever attempted.
    assert_eq!(gw.paths(), vec!["GET /ip", "POST /nodes/node-1"]);
}

#[tokio::test]
async fn malformed_ip_lookup_fails_before_register() {
    let mut gw = TestGateway::ok();
    gw.malformed_ip = true;
    let addr = serve(&gw).await;
    let runner = test_runner(&test_config(addr, 60));

    let err = runner.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Gateway(_)), "{err}");

    assert_eq!(gw.paths(), vec!["GET /ip"]);
}

#[tokio::test]
async fn ping_failure_aborts_without_stop_session() {
    let mut gw = TestGateway::ok();
    gw.ping_status = 502;
    let addr = serve(&gw).await;
    let runner = test_runner(&test_config(addr, 60));

    let err = runner.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Gateway(_)), "{err}");

    // The abort is hard: no best-effort stop-session on the error path.
    let paths = gw.paths();
    assert_eq!(paths.last().unwrap(), "POST /nodes/node-1/ping");
    assert!(!paths.iter().any(|p| p.ends_with("/stop-session")));
}

#[tokio::test]
async fn one_ping_per_interval() {
    let gw = TestGateway::ok();
    let addr = serve(&gw).await;
    let runner = test_runner(&test_config(addr, 1));

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { runner.run(shutdown).await }
    });

    // Anchor on the initial ping, then let two full intervals elapse.
    wait_for(&gw, "initial ping", |gw| gw.ping_count() >= 1).await;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    shutdown.cancel();
    handle.await.unwrap().unwrap();

    // Initial ping + one per elapsed interval.
    assert_eq!(gw.ping_count(), 3, "calls: {:?}", gw.paths());
}

#[tokio::test]
async fn stop_session_failure_does_not_fail_shutdown() {
    let mut gw = TestGateway::ok();
    gw.stop_status = 500;
    let addr = serve(&gw).await;
    let runner = test_runner(&test_config(addr, 60));

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { runner.run(shutdown).await }
    });

    wait_for(&gw, "initial ping", |gw| gw.ping_count() >= 1).await;
    shutdown.cancel();

    // The failed stop-session is logged, not propagated.
    handle.await.unwrap().unwrap();
    assert_eq!(gw.paths().last().unwrap(), "POST /nodes/node-1/stop-session");
}
