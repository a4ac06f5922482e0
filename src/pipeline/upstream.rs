//! Forecast API client.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::pipeline::types::{Coordinates, Payload, UpstreamError};

/// Fetches forecast data for a coordinate pair.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    async fn fetch(&self, coordinates: Coordinates) -> Result<Payload, UpstreamError>;
}

/// Open-Meteo forecast client.
///
/// One GET per call, no retries. A 200 with a JSON body is the only success.
#[derive(Debug, Clone)]
pub struct OpenMeteoFetcher {
    client: reqwest::Client,
    endpoint: String,
    hourly: String,
}

impl OpenMeteoFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
            hourly: config.hourly.clone(),
        })
    }
}

#[async_trait]
impl UpstreamFetcher for OpenMeteoFetcher {
    async fn fetch(&self, coordinates: Coordinates) -> Result<Payload, UpstreamError> {
        tracing::info!(
            latitude = coordinates.latitude(),
            longitude = coordinates.longitude(),
            "Fetching weather data from Open-Meteo"
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("latitude", coordinates.latitude().to_string()),
                ("longitude", coordinates.longitude().to_string()),
                ("hourly", self.hourly.clone()),
            ])
            .send()
            .await
            .map_err(|e| {
                metrics::record_upstream("error".to_string());
                tracing::warn!(error = %e, "Open-Meteo request failed");
                UpstreamError::transport(e.to_string())
            })?;

        let status = response.status();
        metrics::record_upstream(status.as_u16().to_string());
        tracing::info!(status = %status, "Received response from Open-Meteo");

        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(
                status.as_u16(),
                format!("Open-Meteo returned {status}: {}", truncate(&body, 256)),
            ));
        }

        response.json::<Payload>().await.map_err(|e| {
            UpstreamError::status(status.as_u16(), format!("invalid JSON body from Open-Meteo: {e}"))
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
