use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "weather-cli")]
#[command(about = "Query CLI for the weather service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the forecast for a location
    Weather {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
    },
    /// Check service health
    Health,
    /// Dump the Prometheus scrape from the metrics endpoint
    Metrics {
        #[arg(long, default_value = "http://localhost:9090")]
        metrics_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Weather { latitude, longitude } => {
            let res = client
                .get(format!("{}/weather", cli.url))
                .query(&[("latitude", latitude), ("longitude", longitude)])
                .send()
                .await?;
            if let Some(cache) = res.headers().get("x-cache").and_then(|v| v.to_str().ok()) {
                eprintln!("cache: {}", cache);
            }
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Metrics { metrics_url } => {
            let res = client.get(format!("{}/metrics", metrics_url)).send().await?;
            let text = res.text().await?;
            for line in text.lines().filter(|l| l.starts_with("weather_")) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
