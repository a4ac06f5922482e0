//! Weather request pipeline.
//!
//! # Data Flow
//! ```text
//! RequestContext (coordinates + trace ids)
//!     → fault.rs (maybe fail on purpose)
//!     → downstream.rs (call the second service)
//!     → cache store read (hit returns here)
//!     → upstream.rs (Open-Meteo fetch)
//!     → cache store write (best effort)
//!     → Payload
//! ```
//!
//! orchestrator.rs sequences the steps; the other modules are the
//! collaborators it is built from.

pub mod downstream;
pub mod fault;
pub mod orchestrator;
pub mod types;
pub mod upstream;

pub use downstream::{DownstreamCaller, HttpDownstream, StaticDownstream};
pub use fault::{FaultInjector, FixedRandom, RandomSource, SeededRandom, ThreadRandom};
pub use orchestrator::{PipelineSettings, WeatherPipeline};
pub use types::{
    CacheStatus, CoordinateError, Coordinates, DownstreamError, InjectedFault, Payload,
    PipelineError, PipelineResult, RequestContext, Served, UpstreamError,
};
pub use upstream::{OpenMeteoFetcher, UpstreamFetcher};
