//! Second-service client.
//!
//! The call carries the request's trace context so the second service's
//! spans join the same trace.

use async_trait::async_trait;

use crate::observability::metrics;
use crate::observability::tracing::{TraceContext, TRACEPARENT, X_REQUEST_ID};
use crate::pipeline::types::{DownstreamError, Payload};

/// Greeting returned by the second service.
pub const GREETING: &str = "Hey there";

/// Calls an independent service as part of every request.
#[async_trait]
pub trait DownstreamCaller: Send + Sync {
    async fn call(&self, trace: &TraceContext) -> Result<Payload, DownstreamError>;
}

/// HTTP client for the second service.
#[derive(Debug, Clone)]
pub struct HttpDownstream {
    client: reqwest::Client,
    url: String,
}

impl HttpDownstream {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl DownstreamCaller for HttpDownstream {
    async fn call(&self, trace: &TraceContext) -> Result<Payload, DownstreamError> {
        tracing::info!(url = %self.url, "Requesting second service");

        let outgoing = trace.child();
        let response = self
            .client
            .get(&self.url)
            .header(TRACEPARENT, outgoing.traceparent())
            .header(X_REQUEST_ID, &outgoing.request_id)
            .send()
            .await
            .map_err(|e| {
                metrics::record_downstream("error".to_string());
                DownstreamError::Transport(e.to_string())
            })?;

        let status = response.status();
        metrics::record_downstream(status.as_u16().to_string());
        tracing::info!(status = %status, "Received response from second service");

        if status != reqwest::StatusCode::OK {
            return Err(DownstreamError::Status(status.as_u16()));
        }

        response
            .json::<Payload>()
            .await
            .map_err(|e| DownstreamError::InvalidBody(e.to_string()))
    }
}

/// In-process stand-in that always answers with the greeting.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDownstream;

#[async_trait]
impl DownstreamCaller for StaticDownstream {
    async fn call(&self, _trace: &TraceContext) -> Result<Payload, DownstreamError> {
        Ok(Payload::String(GREETING.to_string()))
    }
}
