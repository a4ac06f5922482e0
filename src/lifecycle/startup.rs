//! Startup wiring.
//!
//! Builds every pipeline collaborator from configuration and hands them to
//! the pipeline. The caller (the binary entry point or a test) owns the
//! resulting values for the life of the process.

use std::sync::Arc;
use thiserror::Error;

use crate::cache::MemoryStore;
use crate::config::ServiceConfig;
use crate::pipeline::{
    FaultInjector, HttpDownstream, OpenMeteoFetcher, PipelineSettings, WeatherPipeline,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid address {0:?}")]
    Address(String),
}

/// The pipeline plus the store it writes to.
pub struct Components {
    pub pipeline: Arc<WeatherPipeline>,
    pub store: MemoryStore,
}

/// Construct the production pipeline.
pub fn build_pipeline(config: &ServiceConfig) -> Result<Components, StartupError> {
    let store = MemoryStore::new();
    let upstream = OpenMeteoFetcher::new(&config.upstream)?;
    let downstream = HttpDownstream::new(config.downstream.url.clone())?;

    let pipeline = WeatherPipeline::new(
        PipelineSettings::from(config),
        Arc::new(upstream),
        Arc::new(store.clone()),
    )
    .with_downstream(Arc::new(downstream))
    .with_fault_injector(FaultInjector::from_seed(config.faults.seed));

    tracing::info!(
        upstream = %config.upstream.endpoint,
        downstream = %config.downstream.url,
        downstream_enabled = config.downstream.enabled,
        fault_injection = config.faults.enabled,
        fault_probability = config.faults.probability,
        seeded = config.faults.seed.is_some(),
        cache_ttl_secs = config.cache.ttl_secs,
        "Pipeline initialized"
    );

    Ok(Components {
        pipeline: Arc::new(pipeline),
        store,
    })
}
