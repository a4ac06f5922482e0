//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use weather_service::cache::{CacheStore, MemoryStore, StoreError};
use weather_service::http::greeting_router;
use weather_service::observability::tracing::TraceContext;
use weather_service::pipeline::{
    Coordinates, DownstreamCaller, DownstreamError, Payload, UpstreamError, UpstreamFetcher,
};

/// Start a programmable mock backend on an ephemeral port.
///
/// The closure receives the raw request head and returns a status and a
/// JSON body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let (status, body) = f(head).await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Start the second service in-process on an ephemeral port.
pub async fn start_greeting_service() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, greeting_router()).await;
    });
    addr
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Upstream stand-in that counts calls and returns a preset result.
pub struct CountingFetcher {
    calls: AtomicUsize,
    response: Mutex<Result<Payload, UpstreamError>>,
    delay: Duration,
}

impl CountingFetcher {
    pub fn ok(payload: Payload) -> Arc<Self> {
        Self::with(Ok(payload), Duration::ZERO)
    }

    pub fn failing(err: UpstreamError) -> Arc<Self> {
        Self::with(Err(err), Duration::ZERO)
    }

    pub fn with(response: Result<Payload, UpstreamError>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            response: Mutex::new(response),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_response(&self, response: Result<Payload, UpstreamError>) {
        *self.response.lock().unwrap() = response;
    }
}

#[async_trait]
impl UpstreamFetcher for CountingFetcher {
    async fn fetch(&self, _coordinates: Coordinates) -> Result<Payload, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.lock().unwrap().clone()
    }
}

/// Memory store wrapper that counts operations, or fails them on demand.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
    fail_reads: bool,
    fail_writes: bool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            fail_reads: true,
            fail_writes: true,
            ..Self::default()
        })
    }

    pub fn read_only() -> Arc<Self> {
        Arc::new(Self {
            fail_writes: true,
            ..Self::default()
        })
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Decode the payload stored under `key`, if any.
    pub async fn cached(&self, key: &str) -> Option<Payload> {
        self.inner
            .get(key)
            .await
            .unwrap()
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.set(key, value, ttl).await
    }
}

/// Second-service stand-in that counts calls.
pub struct CountingDownstream {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingDownstream {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DownstreamCaller for CountingDownstream {
    async fn call(&self, _trace: &TraceContext) -> Result<Payload, DownstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(DownstreamError::Status(503))
        } else {
            Ok(Payload::String("Hey there".into()))
        }
    }
}

pub fn berlin() -> Coordinates {
    Coordinates::new(52.52, 13.41).unwrap()
}
