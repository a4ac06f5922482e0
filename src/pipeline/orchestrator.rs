//! Cache-aside request pipeline.
//!
//! ```text
//! maybe_raise_random_error            → InjectedFault (stop)
//! request_second_service_http_request → DownstreamError (stop)
//! get_data_from_cache                 → hit: return cached payload
//! fetch_data_from_open_meteo          → UpstreamError (stop, nothing cached)
//! store_data_in_cache                 → failure logged only
//! return fetched payload
//! ```
//!
//! Concurrent misses for the same key are not coalesced: each request that
//! misses calls upstream and writes the cache itself.

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info_span, Instrument};

use crate::cache::{CacheStore, StoreError};
use crate::config::ServiceConfig;
use crate::observability::metrics::{self, StepTimer};
use crate::observability::tracing::TraceContext;
use crate::pipeline::downstream::{DownstreamCaller, StaticDownstream};
use crate::pipeline::fault::FaultInjector;
use crate::pipeline::types::{
    CacheStatus, Coordinates, Payload, PipelineError, PipelineResult, RequestContext, Served,
};
use crate::pipeline::upstream::UpstreamFetcher;

/// Runtime-tunable pipeline behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Run the fault injection step.
    pub fault_injection: bool,
    /// Probability used by the fault injection step.
    pub fault_probability: f64,
    /// Run the second-service step.
    pub downstream: bool,
    /// TTL applied to cache writes.
    pub cache_ttl: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

impl From<&ServiceConfig> for PipelineSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            fault_injection: config.faults.enabled,
            fault_probability: config.faults.probability,
            downstream: config.downstream.enabled,
            cache_ttl: config.cache.ttl(),
        }
    }
}

/// The weather request pipeline.
///
/// Collaborators are injected at construction; the pipeline owns none of
/// their lifecycles beyond holding a reference.
pub struct WeatherPipeline {
    settings: ArcSwap<PipelineSettings>,
    faults: FaultInjector,
    downstream: Arc<dyn DownstreamCaller>,
    store: Arc<dyn CacheStore>,
    upstream: Arc<dyn UpstreamFetcher>,
}

impl WeatherPipeline {
    /// Create a pipeline using the thread RNG and the in-process greeting
    /// stand-in for the second service.
    pub fn new(
        settings: PipelineSettings,
        upstream: Arc<dyn UpstreamFetcher>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            faults: FaultInjector::default(),
            downstream: Arc::new(StaticDownstream),
            store,
            upstream,
        }
    }

    pub fn with_downstream(mut self, downstream: Arc<dyn DownstreamCaller>) -> Self {
        self.downstream = downstream;
        self
    }

    pub fn with_fault_injector(mut self, faults: FaultInjector) -> Self {
        self.faults = faults;
        self
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<PipelineSettings> {
        self.settings.load_full()
    }

    /// Swap settings; requests already in flight keep their snapshot.
    pub fn update_settings(&self, settings: PipelineSettings) {
        tracing::info!(
            fault_injection = settings.fault_injection,
            fault_probability = settings.fault_probability,
            downstream = settings.downstream,
            cache_ttl_secs = settings.cache_ttl.as_secs_f64(),
            "Pipeline settings updated"
        );
        self.settings.store(Arc::new(settings));
    }

    /// Run the pipeline for `coordinates` under a fresh trace.
    pub async fn handle(&self, coordinates: Coordinates) -> PipelineResult<Payload> {
        let ctx = RequestContext::new(coordinates, TraceContext::new_root());
        self.serve(&ctx).await.map(|served| served.payload)
    }

    /// Run the pipeline for one request, reporting whether it hit the cache.
    pub async fn serve(&self, ctx: &RequestContext) -> PipelineResult<Served> {
        let start = Instant::now();
        let span = info_span!(
            "weather_request",
            request_id = %ctx.trace.request_id,
            trace_id = %ctx.trace.trace_id,
            latitude = ctx.coordinates.latitude(),
            longitude = ctx.coordinates.longitude(),
        );

        let result = self.run(ctx).instrument(span).await;
        match &result {
            Ok(Served { cache: CacheStatus::Hit, .. }) => metrics::record_request("cache_hit", start),
            Ok(Served { cache: CacheStatus::Miss, .. }) => metrics::record_request("cache_miss", start),
            Err(e) => {
                tracing::warn!(request_id = %ctx.trace.request_id, error = %e, kind = e.kind(), "Weather request failed");
                metrics::record_request(e.kind(), start);
            }
        }
        result
    }

    async fn run(&self, ctx: &RequestContext) -> PipelineResult<Served> {
        let settings = self.settings.load_full();

        if settings.fault_injection {
            let _timer = StepTimer::start("maybe_raise_random_error");
            let _span = info_span!("maybe_raise_random_error").entered();
            self.faults.maybe_fail(settings.fault_probability)?;
        }

        if settings.downstream {
            self.call_second_service(&ctx.trace)
                .instrument(info_span!("request_second_service_http_request"))
                .await?;
        }

        let key = ctx.coordinates.cache_key();
        if let Some(payload) = self
            .read_cache(&key)
            .instrument(info_span!("get_data_from_cache", key = %key))
            .await
        {
            return Ok(Served {
                payload,
                cache: CacheStatus::Hit,
            });
        }

        let payload = self
            .fetch_upstream(ctx.coordinates)
            .instrument(info_span!("fetch_data_from_open_meteo"))
            .await?;

        self.write_cache(&key, &payload, settings.cache_ttl)
            .instrument(info_span!("store_data_in_cache", key = %key))
            .await;

        Ok(Served {
            payload,
            cache: CacheStatus::Miss,
        })
    }

    async fn call_second_service(&self, trace: &TraceContext) -> PipelineResult<()> {
        let _timer = StepTimer::start("request_second_service_http_request");
        let greeting = self.downstream.call(trace).await.map_err(|e| {
            tracing::error!(error = %e, "Second service call failed");
            e
        })?;
        tracing::debug!(response = %greeting, "Second service answered");
        Ok(())
    }

    /// Fail-open: store errors and undecodable entries read as a miss.
    async fn read_cache(&self, key: &str) -> Option<Payload> {
        let _timer = StepTimer::start("get_data_from_cache");
        tracing::info!("Checking cache for weather data");

        match self.store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Payload>(&bytes) {
                Ok(payload) => {
                    tracing::info!("Found weather data in cache");
                    metrics::record_cache_lookup("hit");
                    Some(payload)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cached entry is not valid JSON, treating as miss");
                    metrics::record_cache_lookup("error");
                    None
                }
            },
            Ok(None) => {
                metrics::record_cache_lookup("miss");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cache read failed, treating as miss");
                metrics::record_cache_lookup("error");
                None
            }
        }
    }

    async fn fetch_upstream(&self, coordinates: Coordinates) -> PipelineResult<Payload> {
        let _timer = StepTimer::start("fetch_data_from_open_meteo");
        self.upstream.fetch(coordinates).await.map_err(|e| {
            tracing::error!(status = ?e.status, error = %e, "Failed to fetch data from Open-Meteo");
            PipelineError::from(e)
        })
    }

    /// Best effort: the fetched payload is served even if this fails.
    async fn write_cache(&self, key: &str, payload: &Payload, ttl: Duration) {
        let _timer = StepTimer::start("store_data_in_cache");
        tracing::info!(ttl_secs = ttl.as_secs_f64(), "Storing weather data in cache");

        let result = match serde_json::to_vec(payload) {
            Ok(bytes) => self.store.set(key, bytes, ttl).await,
            Err(e) => Err(StoreError::from(e)),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Cache write failed, response will not be cached");
            metrics::record_cache_write_failure();
        }
    }
}
