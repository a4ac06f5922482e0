//! Distributed trace context.
//!
//! # Responsibilities
//! - Extract W3C `traceparent` and `x-request-id` from incoming requests
//! - Start a fresh trace when the caller sent none (or a malformed one)
//! - Produce child contexts to propagate to the second service
//!
//! Span export is left to whatever subscriber is installed; this module
//! only carries the identifiers.

use axum::http::HeaderMap;
use uuid::Uuid;

pub const TRACEPARENT: &str = "traceparent";
pub const X_REQUEST_ID: &str = "x-request-id";

/// Trace and correlation identifiers for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// 32 lowercase hex chars.
    pub trace_id: String,
    /// 16 lowercase hex chars identifying the current span.
    pub span_id: String,
    pub sampled: bool,
    pub request_id: String,
}

impl TraceContext {
    /// Start a new trace with a random request id.
    pub fn new_root() -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string(),
            span_id: new_span_id(),
            sampled: true,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Continue the caller's trace if it sent a valid `traceparent`.
    ///
    /// The local span gets a fresh id; the request id is taken from
    /// `x-request-id` when present.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut ctx = headers
            .get(TRACEPARENT)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_traceparent)
            .map(|(trace_id, sampled)| Self {
                trace_id,
                span_id: new_span_id(),
                sampled,
                request_id: String::new(),
            })
            .unwrap_or_else(Self::new_root);

        match headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
            Some(id) if !id.is_empty() => ctx.request_id = id.to_string(),
            _ if ctx.request_id.is_empty() => ctx.request_id = Uuid::new_v4().to_string(),
            _ => {}
        }
        ctx
    }

    /// Context for an outgoing call made within this span.
    pub fn child(&self) -> Self {
        Self {
            span_id: new_span_id(),
            ..self.clone()
        }
    }

    /// Render as a W3C `traceparent` header value.
    pub fn traceparent(&self) -> String {
        let flags = if self.sampled { "01" } else { "00" };
        format!("00-{}-{}-{}", self.trace_id, self.span_id, flags)
    }
}

fn new_span_id() -> String {
    format!("{:016x}", fastrand::u64(1..))
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Returns (trace_id, sampled) for a well-formed header.
fn parse_traceparent(value: &str) -> Option<(String, bool)> {
    let mut parts = value.trim().split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let parent_id = parts.next()?;
    let flags = parts.next()?;

    if !is_hex(version, 2) || version == "ff" {
        return None;
    }
    // Version 00 has exactly four fields.
    if version == "00" && parts.next().is_some() {
        return None;
    }
    if !is_hex(trace_id, 32) || trace_id.bytes().all(|b| b == b'0') {
        return None;
    }
    if !is_hex(parent_id, 16) || parent_id.bytes().all(|b| b == b'0') {
        return None;
    }
    if !is_hex(flags, 2) {
        return None;
    }
    let sampled = u8::from_str_radix(flags, 16).ok()? & 0x01 == 1;

    Some((trace_id.to_string(), sampled))
}
