//! Weather service (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                   WEATHER SERVICE                    │
//!   GET /weather      │  ┌────────┐   ┌─────────────────────────────────┐    │
//!  ───────────────────┼─▶│  http  │──▶│            pipeline             │    │
//!                     │  │ server │   │  fault → downstream → cache ──┐ │    │
//!                     │  └────────┘   │              miss → upstream ─┘ │    │
//!                     │               └──────┬──────────┬───────────┬───┘    │
//!                     │                      │          │           │        │
//!                     │                      ▼          ▼           ▼        │
//!                     │               second service  cache    Open-Meteo    │
//!                     │                                                      │
//!                     │   config · observability · lifecycle (cross-cutting) │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use weather_service::config::{load_config, watcher::ConfigWatcher, ServiceConfig};
use weather_service::lifecycle::{signals::shutdown_signal, Shutdown, StartupError};
use weather_service::observability::{logging, metrics};
use weather_service::HttpServer;

#[derive(Parser)]
#[command(name = "weather-service")]
#[command(about = "Instrumented weather endpoint with cache-aside and fault injection", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload pipeline settings when the config file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!("weather-service v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        config_file = ?cli.config,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    // Kept alive for the life of the process when watching.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path, &config);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();
    let mut server_task = tokio::spawn(server.run(listener, config_updates, server_shutdown));

    let finished_early = tokio::select! {
        _ = shutdown_signal() => None,
        result = &mut server_task => Some(result),
    };
    let result = match finished_early {
        Some(result) => result,
        None => {
            shutdown.trigger();
            server_task.await
        }
    };
    result??;

    tracing::info!("Shutdown complete");
    Ok(())
}
