//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (assign/propagate x-request-id)
//!     → weather.rs (parse coordinates, run the pipeline)
//!     → response.rs (map failures to status + detail)
//!     → Send to client
//! ```
//!
//! greeting.rs is the router of the separate second service.

pub mod greeting;
pub mod request;
pub mod response;
pub mod server;
pub mod weather;

pub use greeting::greeting_router;
pub use response::{ApiError, ErrorBody};
pub use server::{AppState, HttpServer};
pub use weather::{WeatherQuery, X_CACHE};
