//! Request identification.
//!
//! Every request gets an `x-request-id` (UUID v4 unless the caller sent
//! one) before any handler runs, and the same id is echoed on the response.

use axum::http::HeaderName;
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub use crate::observability::tracing::X_REQUEST_ID;

/// Wrap `router` with request id generation and propagation.
pub fn with_request_id<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let header = HeaderName::from_static(X_REQUEST_ID);
    router
        .layer(PropagateRequestIdLayer::new(header.clone()))
        .layer(SetRequestIdLayer::new(header, MakeRequestUuid))
}
