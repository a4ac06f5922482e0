//! Cache store subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline cache read
//!     → store.rs (CacheStore::get, expired entries read as absent)
//! pipeline cache write
//!     → store.rs (CacheStore::set with TTL)
//!     → memory.rs (DashMap entry with expiry instant)
//! sweeper task
//!     → memory.rs (purge expired entries on an interval)
//! ```
//!
//! The store only deals in bytes; encoding the payload is the pipeline's job.

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{CacheStore, StoreError};
