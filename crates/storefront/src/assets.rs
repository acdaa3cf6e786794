//! Read-through cache for binary assets in the object store.

use std::sync::Arc;

use axum::body::Bytes;
use boutique_core::AssetKey;
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::store::{ObjectStore, StoreError};

/// Content type assumed when the stored object carries none.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Errors returned by [`AssetResolver`].
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    /// The object store has nothing under the key.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetKey),

    /// The object store could not be reached or refused the request.
    #[error("object store unavailable: {0}")]
    BackendUnavailable(#[source] StoreError),
}

/// A resolved asset.
///
/// Clones share the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub data: Bytes,
    pub content_type: String,
}

/// Process-wide asset cache keyed by exact asset key.
///
/// Successful lookups are kept for the life of the process. Failures,
/// including misses, are never cached.
#[derive(Clone)]
pub struct AssetResolver {
    store: Arc<dyn ObjectStore>,
    cache: Cache<AssetKey, Asset>,
}

impl AssetResolver {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            cache: Cache::builder().build(),
        }
    }

    /// Resolve `key` to its bytes and content type.
    ///
    /// # Errors
    ///
    /// Returns `AssetError::AssetNotFound` if the store has no such object,
    /// or `AssetError::BackendUnavailable` if the store call fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn fetch(&self, key: &AssetKey) -> Result<Asset, AssetError> {
        self.cache
            .try_get_with_by_ref(key, self.load(key))
            .await
            .map_err(|e| (*e).clone())
    }

    async fn load(&self, key: &AssetKey) -> Result<Asset, AssetError> {
        debug!("Cache miss, fetching asset");
        let object = self
            .store
            .get(key.as_str())
            .await
            .map_err(AssetError::BackendUnavailable)?
            .ok_or_else(|| AssetError::AssetNotFound(key.clone()))?;

        Ok(Asset {
            data: Bytes::from(object.data),
            content_type: object
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        })
    }
}
