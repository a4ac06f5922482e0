//! Pipeline data types and error taxonomy.

use thiserror::Error;

use crate::observability::tracing::TraceContext;

/// Structured response body; opaque to the cache.
pub type Payload = serde_json::Value;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A validated (latitude, longitude) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Validate and normalise a coordinate pair.
    ///
    /// `-0.0` becomes `0.0` so that equal pairs always format to the same key.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude: latitude + 0.0,
            longitude: longitude + 0.0,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Cache key for this pair, e.g. `weather_data_52.52_13.41`.
    ///
    /// Uses the shortest representation that round-trips, so the same `f64`
    /// always yields the same string. Whole numbers carry no fraction:
    /// `(52.0, 13.0)` keys as `weather_data_52_13`, not `weather_data_52.0_13.0`.
    pub fn cache_key(&self) -> String {
        format!("weather_data_{}_{}", self.latitude, self.longitude)
    }
}

/// Rejected coordinate input.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude must be a finite number within [-90, 90], got {0}")]
    Latitude(f64),
    #[error("longitude must be a finite number within [-180, 180], got {0}")]
    Longitude(f64),
}

/// Per-request state threaded through every step. Never persisted.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub coordinates: Coordinates,
    pub trace: TraceContext,
}

impl RequestContext {
    pub fn new(coordinates: Coordinates, trace: TraceContext) -> Self {
        Self { coordinates, trace }
    }
}

/// Where a served payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A successful pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Served {
    pub payload: Payload,
    pub cache: CacheStatus,
}

/// Synthetic failure raised by the fault injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Random error occurred")]
pub struct InjectedFault;

/// The second service could not be called successfully.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("second service returned status {0}")]
    Status(u16),
    #[error("second service request failed: {0}")]
    Transport(String),
    #[error("second service returned an invalid body: {0}")]
    InvalidBody(String),
}

/// The forecast API call failed.
///
/// `status` is `None` when no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

/// Terminal pipeline failures. Cache store errors never appear here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InjectedFault(#[from] InjectedFault),

    #[error("Failed to fetch data from second service")]
    Downstream(#[source] DownstreamError),

    #[error("Failed to fetch data from Open-Meteo")]
    Upstream(#[source] UpstreamError),
}

impl PipelineError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InjectedFault(_) => "injected_fault",
            PipelineError::Downstream(_) => "downstream_error",
            PipelineError::Upstream(_) => "upstream_error",
        }
    }
}

impl From<DownstreamError> for PipelineError {
    fn from(e: DownstreamError) -> Self {
        PipelineError::Downstream(e)
    }
}

impl From<UpstreamError> for PipelineError {
    fn from(e: UpstreamError) -> Self {
        PipelineError::Upstream(e)
    }
}
