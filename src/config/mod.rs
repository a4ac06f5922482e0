//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!
//! With --watch:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → sent to the server, which swaps the pipeline settings
//! ```
//!
//! Only pipeline settings (fault injection, downstream toggle, cache TTL)
//! take effect on reload; listener and client settings need a restart.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CacheConfig, DownstreamConfig, FaultConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ServiceConfig, TimeoutConfig, UpstreamConfig,
};
