//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Run background tasks (cache sweeper, settings reload)
//! - Serve until shutdown is broadcast

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::MemoryStore;
use crate::config::ServiceConfig;
use crate::http::request::with_request_id;
use crate::http::weather::{get_health, get_weather};
use crate::lifecycle::startup::{build_pipeline, StartupError};
use crate::pipeline::{PipelineSettings, WeatherPipeline};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<WeatherPipeline>,
}

/// HTTP server for the weather service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    pipeline: Arc<WeatherPipeline>,
    store: Option<MemoryStore>,
}

impl HttpServer {
    /// Create a server with production collaborators built from `config`.
    pub fn new(config: ServiceConfig) -> Result<Self, StartupError> {
        let components = build_pipeline(&config)?;
        let mut server = Self::with_pipeline(config, components.pipeline);
        server.store = Some(components.store);
        Ok(server)
    }

    /// Create a server around an already-built pipeline.
    ///
    /// No cache sweeper runs, since the pipeline's store is not known here.
    pub fn with_pipeline(config: ServiceConfig, pipeline: Arc<WeatherPipeline>) -> Self {
        let state = AppState {
            pipeline: pipeline.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            pipeline,
            store: None,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        let routes = Router::new()
            .route("/weather", get(get_weather))
            .route("/health", get(get_health))
            .with_state(state)
            .layer(middleware);

        with_request_id(routes)
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration received on `config_updates` is applied to the pipeline
    /// settings; the server stops once `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(store) = self.store.clone() {
            let interval = Duration::from_secs(self.config.cache.sweep_interval_secs);
            tokio::spawn(store.run_sweeper(interval, shutdown.resubscribe()));
        }

        tokio::spawn(apply_config_updates(
            self.pipeline.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get the pipeline behind the router.
    pub fn pipeline(&self) -> &Arc<WeatherPipeline> {
        &self.pipeline
    }
}

async fn apply_config_updates(
    pipeline: Arc<WeatherPipeline>,
    mut updates: mpsc::UnboundedReceiver<ServiceConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    let settings = PipelineSettings::from(&config);
                    if *pipeline.settings() != settings {
                        pipeline.update_settings(settings);
                    }
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}
