//! Second service: answers `GET /test` with a fixed greeting.
//!
//! Called by the weather service on every request so that one trace spans
//! both processes.

use clap::Parser;
use tokio::net::TcpListener;

use weather_service::config::{LogFormat, ObservabilityConfig};
use weather_service::http::greeting_router;
use weather_service::lifecycle::signals::shutdown_signal;
use weather_service::observability::logging;

#[derive(Parser)]
#[command(name = "second-service")]
#[command(about = "Downstream greeting service for the weather service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "0.0.0.0:8001")]
    bind: String,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON log lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init_logging(&ObservabilityConfig {
        log_level: cli.log_level,
        log_format: if cli.json { LogFormat::Json } else { LogFormat::Pretty },
        ..ObservabilityConfig::default()
    });

    let listener = TcpListener::bind(&cli.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "hello from startup second service");

    axum::serve(listener, greeting_router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
