//! Failure injection tests against the running HTTP service.

use axum::http::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use weather_service::config::ServiceConfig;
use weather_service::http::{ErrorBody, HttpServer};
use weather_service::lifecycle::Shutdown;
use weather_service::observability::tracing::TraceContext;
use weather_service::pipeline::{
    DownstreamCaller, DownstreamError, HttpDownstream, OpenMeteoFetcher, UpstreamFetcher,
};

mod common;

const FORECAST: &str = r#"{"latitude":52.52,"longitude":13.41,"hourly":{"temperature_2m":[1,2,3]}}"#;

struct Harness {
    addr: SocketAddr,
    shutdown: Shutdown,
    config_tx: mpsc::UnboundedSender<ServiceConfig>,
    config: ServiceConfig,
}

impl Harness {
    fn url(&self, query: &str) -> String {
        format!("http://{}{}", self.addr, query)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn base_config(upstream: SocketAddr, downstream: SocketAddr) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.upstream.endpoint = format!("http://{}/v1/forecast", upstream);
    config.downstream.url = format!("http://{}/test", downstream);
    config.faults.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

async fn start_service(config: ServiceConfig) -> Harness {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config.clone()).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Harness {
        addr,
        shutdown,
        config_tx,
        config,
    }
}

/// Upstream that serves `FORECAST` and counts hits.
async fn forecast_backend() -> (SocketAddr, Arc<AtomicU32>, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(AtomicU32::new(0));
    let heads = Arc::new(Mutex::new(Vec::new()));
    let (c, h) = (calls.clone(), heads.clone());
    let addr = common::start_programmable_backend(move |head| {
        c.fetch_add(1, Ordering::SeqCst);
        h.lock().unwrap().push(head);
        async move { (200, FORECAST.to_string()) }
    })
    .await;
    (addr, calls, heads)
}

#[tokio::test]
async fn test_miss_then_hit() {
    let (upstream, calls, heads) = forecast_backend().await;
    let downstream = common::start_greeting_service().await;
    let service = start_service(base_config(upstream, downstream)).await;
    let client = common::http_client();

    let res = client
        .get(service.url("/weather?latitude=52.52&longitude=13.41"))
        .send()
        .await
        .expect("service unreachable");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-cache"], "MISS");
    assert!(res.headers().contains_key("x-request-id"));
    let first: Value = res.json().await.unwrap();
    assert_eq!(first["hourly"]["temperature_2m"], json!([1, 2, 3]));

    let res = client
        .get(service.url("/weather?latitude=52.52&longitude=13.41"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-cache"], "HIT");
    let second: Value = res.json().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let head = heads.lock().unwrap()[0].clone();
    assert!(head.starts_with("GET /v1/forecast?"), "{head}");
    assert!(head.contains("latitude=52.52"));
    assert!(head.contains("longitude=13.41"));
    assert!(head.contains("hourly=temperature_2m"));
}

#[tokio::test]
async fn test_trace_context_reaches_second_service() {
    let (upstream, _, _) = forecast_backend().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let downstream = common::start_programmable_backend(move |head| {
        s.lock().unwrap().push(head);
        async move { (200, "\"Hey there\"".to_string()) }
    })
    .await;
    let service = start_service(base_config(upstream, downstream)).await;

    let res = common::http_client()
        .get(service.url("/weather?latitude=52.52&longitude=13.41"))
        .header("traceparent", "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "req-42");

    let head = seen.lock().unwrap()[0].to_lowercase();
    assert!(head.starts_with("get /test "), "{head}");
    assert!(head.contains("traceparent: 00-4bf92f3577b34da6a3ce929d0e0e4736-"), "{head}");
    assert!(!head.contains("00f067aa0ba902b7"), "child span id must be fresh: {head}");
    assert!(head.contains("x-request-id: req-42"), "{head}");
}

#[tokio::test]
async fn test_injected_fault_returns_500() {
    let (upstream, calls, _) = forecast_backend().await;
    let downstream = common::start_greeting_service().await;
    let mut config = base_config(upstream, downstream);
    config.faults.enabled = true;
    config.faults.probability = 1.0;
    let service = start_service(config).await;

    let res = common::http_client()
        .get(service.url("/weather?latitude=52.52&longitude=13.41"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = res.json().await.unwrap();
    assert_eq!(body.detail, "Random error occurred");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_second_service_failure_returns_500() {
    let (upstream, calls, _) = forecast_backend().await;
    let downstream =
        common::start_programmable_backend(|_| async { (503, "\"down\"".to_string()) }).await;
    let service = start_service(base_config(upstream, downstream)).await;

    let res = common::http_client()
        .get(service.url("/weather?latitude=52.52&longitude=13.41"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = res.json().await.unwrap();
    assert_eq!(body.detail, "Failed to fetch data from second service");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upstream_failure_returns_500_and_is_not_cached() {
    let healthy = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let calls = Arc::new(AtomicU32::new(0));
    let (h, c) = (healthy.clone(), calls.clone());
    let upstream = common::start_programmable_backend(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        let ok = h.load(Ordering::SeqCst);
        async move {
            if ok {
                (200, FORECAST.to_string())
            } else {
                (500, r#"{"error":true,"reason":"boom"}"#.to_string())
            }
        }
    })
    .await;
    let downstream = common::start_greeting_service().await;
    let service = start_service(base_config(upstream, downstream)).await;
    let client = common::http_client();

    let res = client
        .get(service.url("/weather?latitude=1.5&longitude=2.5"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = res.json().await.unwrap();
    assert_eq!(body.detail, "Failed to fetch data from Open-Meteo");

    healthy.store(true, Ordering::SeqCst);
    let res = client
        .get(service.url("/weather?latitude=1.5&longitude=2.5"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-cache"], "MISS");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalid_query_returns_400() {
    let (upstream, calls, _) = forecast_backend().await;
    let downstream = common::start_greeting_service().await;
    let service = start_service(base_config(upstream, downstream)).await;
    let client = common::http_client();

    for query in [
        "/weather?latitude=52.52",
        "/weather?latitude=abc&longitude=13.41",
        "/weather?latitude=95&longitude=13.41",
        "/weather?latitude=NaN&longitude=13.41",
    ] {
        let res = client.get(service.url(query)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{query}");
        let body: ErrorBody = res.json().await.unwrap();
        assert!(!body.detail.is_empty());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_health() {
    let (upstream, _, _) = forecast_backend().await;
    let downstream = common::start_greeting_service().await;
    let service = start_service(base_config(upstream, downstream)).await;

    let res = common::http_client().get(service.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_reloaded_settings_take_effect() {
    let (upstream, _, _) = forecast_backend().await;
    let downstream = common::start_greeting_service().await;
    let service = start_service(base_config(upstream, downstream)).await;
    let client = common::http_client();
    let url = service.url("/weather?latitude=52.52&longitude=13.41");

    assert_eq!(client.get(&url).send().await.unwrap().status(), StatusCode::OK);

    let mut updated = service.config.clone();
    updated.faults.enabled = true;
    updated.faults.probability = 1.0;
    service.config_tx.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_fetcher_classifies_responses() {
    let bad_json = common::start_programmable_backend(|_| async { (200, "not json".to_string()) }).await;
    let unavailable = common::start_programmable_backend(|_| async { (503, "{}".to_string()) }).await;

    let mut config = ServiceConfig::default().upstream;
    config.endpoint = format!("http://{}/v1/forecast", bad_json);
    let err = OpenMeteoFetcher::new(&config)
        .unwrap()
        .fetch(common::berlin())
        .await
        .unwrap_err();
    assert_eq!(err.status, Some(200));

    config.endpoint = format!("http://{}/v1/forecast", unavailable);
    let err = OpenMeteoFetcher::new(&config)
        .unwrap()
        .fetch(common::berlin())
        .await
        .unwrap_err();
    assert_eq!(err.status, Some(503));

    // Nothing listens on a port we just released.
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    config.endpoint = format!("http://{}/v1/forecast", closed);
    let err = OpenMeteoFetcher::new(&config)
        .unwrap()
        .fetch(common::berlin())
        .await
        .unwrap_err();
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn test_http_downstream_against_second_service() {
    let addr = common::start_greeting_service().await;
    let trace = TraceContext::new_root();

    let ok = HttpDownstream::new(format!("http://{}/test", addr)).unwrap();
    assert_eq!(ok.call(&trace).await.unwrap(), json!("Hey there"));

    let missing = HttpDownstream::new(format!("http://{}/nope", addr)).unwrap();
    assert!(matches!(
        missing.call(&trace).await,
        Err(DownstreamError::Status(404))
    ));
}
