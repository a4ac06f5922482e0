//! The second service: a single endpoint answering with a fixed greeting.
//!
//! It exists to be called by the weather pipeline so that traces span two
//! services; it joins the caller's trace through `traceparent`.

use axum::{http::HeaderMap, routing::get, Json, Router};

use crate::http::request::with_request_id;
use crate::observability::tracing::TraceContext;
use crate::pipeline::downstream::GREETING;

/// Router for the second service (`GET /test`).
pub fn greeting_router() -> Router {
    with_request_id(Router::new().route("/test", get(greet)))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn greet(headers: HeaderMap) -> Json<&'static str> {
    let trace = TraceContext::from_headers(&headers);
    let span = tracing::info_span!(
        "second_service_http_test_server",
        trace_id = %trace.trace_id,
        request_id = %trace.request_id,
    );
    let _entered = span.enter();
    tracing::info!("test - hey there from the second service");
    Json(GREETING)
}
