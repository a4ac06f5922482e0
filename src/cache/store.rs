//! Key-value store contract used by the pipeline.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a cache store.
///
/// Never fatal to a request: read errors count as a miss, write errors
/// only mean the response is not cached.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached or refused the operation.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// Payload could not be encoded for storage.
    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A key-value store whose entries expire after a fixed TTL.
///
/// Implementations own their concurrency control; the pipeline calls them
/// from many requests at once.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the bytes stored under `key` if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;
}
