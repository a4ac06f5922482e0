//! Weather and health handlers.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::tracing::TraceContext;
use crate::pipeline::{Coordinates, RequestContext};

/// Response header reporting whether the payload came from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Query string of `GET /weather`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeatherQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// `GET /weather?latitude=..&longitude=..`
pub async fn get_weather(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let coordinates = Coordinates::new(query.latitude, query.longitude)?;
    let ctx = RequestContext::new(coordinates, TraceContext::from_headers(&headers));

    let served = state.pipeline.serve(&ctx).await?;

    let mut response = Json(served.payload).into_response();
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(served.cache.as_str()));
    Ok(response)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// `GET /health`
pub async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
