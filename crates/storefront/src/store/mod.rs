//! Backing stores for product metadata and image bytes.
//!
//! # Architecture
//!
//! - [`KeyValueStore`] holds JSON-encoded product records keyed by product id
//! - [`ObjectStore`] holds binary assets keyed by opaque asset key
//! - [`nats`] implements both over NATS JetStream with one shared connection
//! - [`memory`] implements both in-process for tests and local demos
//!
//! Stores are read-only from the storefront's point of view. The caching
//! layers in [`crate::catalog`] and [`crate::assets`] sit in front of them.

pub mod memory;
pub mod nats;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::{MemoryKeyValue, MemoryObjectStore};
pub use nats::{NatsConnection, NatsKeyValue, NatsObjectStore};

/// Errors returned by backing stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store connection could not be established.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within the configured timeout.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// The store answered with an error.
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the failure means the store could not be reached at all.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// A binary object with its optional content type header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Read access to a key-value bucket.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// List up to `limit` keys in store order.
    async fn keys(&self, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Fetch the value under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Read access to an object-store bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object stored under exactly `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError>;
}

/// Run a store call with a bounded timeout.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
