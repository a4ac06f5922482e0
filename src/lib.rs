//! Instrumented weather service library.
//!
//! The core is [`pipeline::WeatherPipeline`], a cache-aside fetch of
//! Open-Meteo forecasts with fault injection and a call to a second service,
//! traced and measured at every step.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::WeatherPipeline;
