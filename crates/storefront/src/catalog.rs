//! Read-through product cache in front of the key-value store.
//!
//! Product records are JSON documents keyed by product id. The cache keeps
//! two things for the life of the process:
//!
//! - a sample of known product ids, listed once from the store on first use
//! - every product record fetched so far, keyed by id
//!
//! Nothing is evicted or invalidated: records are treated as immutable for
//! the cache's lifetime, so the first read wins. The id sample is bounded by
//! the caller-supplied limit (see `CATALOG_SAMPLE_SIZE`), which keeps cold
//! starts from fanning out across the whole catalog.

use std::sync::Arc;

use boutique_core::{Product, ProductId};
use futures::future::join_all;
use moka::future::Cache;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::store::{KeyValueStore, StoreError};

/// Errors returned by [`ProductCache`].
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The key-value store could not be reached or refused the request.
    #[error("backing store unavailable: {0}")]
    BackingStoreUnavailable(#[source] StoreError),

    /// No record exists under the id.
    #[error("product not found: {0}")]
    RecordNotFound(ProductId),

    /// The stored record is not a valid product document.
    #[error("invalid product record {id}: {message}")]
    Decode { id: ProductId, message: String },
}

/// Process-wide product cache.
///
/// Cheaply cloneable; clones share the same cache.
#[derive(Clone)]
pub struct ProductCache {
    inner: Arc<ProductCacheInner>,
}

struct ProductCacheInner {
    store: Arc<dyn KeyValueStore>,
    known_ids: Mutex<Vec<ProductId>>,
    by_id: Cache<ProductId, Product>,
}

impl ProductCache {
    /// Create an empty cache over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(ProductCacheInner {
                store,
                known_ids: Mutex::new(Vec::new()),
                by_id: Cache::builder().build(),
            }),
        }
    }

    /// List up to `limit` products from the known-id sample.
    ///
    /// The sample is populated from the store on the first call that finds
    /// it empty. Records missing from the store, or failing to decode or
    /// fetch with a backend error, are left out of the result rather than
    /// failing the call.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::BackingStoreUnavailable` if the store cannot
    /// be reached, either while populating the id sample or while fetching
    /// a record.
    #[instrument(skip(self))]
    pub async fn list(&self, limit: usize) -> Result<Vec<Product>, CatalogError> {
        let ids = self.known_ids(limit).await?;

        let lookups = ids.iter().take(limit).map(|id| async move {
            match self.get(*id).await {
                Ok(product) => Ok(Some(product)),
                Err(CatalogError::RecordNotFound(_)) => {
                    debug!(product_id = %id, "Known product has no record, skipping");
                    Ok(None)
                }
                Err(CatalogError::BackingStoreUnavailable(e)) if e.is_unavailable() => {
                    Err(CatalogError::BackingStoreUnavailable(e))
                }
                Err(e) => {
                    warn!(product_id = %id, error = %e, "Failed to load product, skipping");
                    Ok(None)
                }
            }
        });

        let products = join_all(lookups)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products.into_iter().flatten().collect())
    }

    /// Get one product by id, fetching it on a cache miss.
    ///
    /// Concurrent calls for the same uncached id share a single store fetch.
    /// Failures are not cached, so a later call fetches again.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::RecordNotFound` if the store has no record,
    /// `CatalogError::Decode` if the record is malformed, or
    /// `CatalogError::BackingStoreUnavailable` if the fetch fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.inner
            .by_id
            .try_get_with(id, self.fetch(id))
            .await
            .map_err(|e| (*e).clone())
    }

    /// Current known-id sample, populating it if empty.
    async fn known_ids(&self, limit: usize) -> Result<Vec<ProductId>, CatalogError> {
        let mut known = self.inner.known_ids.lock().await;
        if known.is_empty() {
            let keys = self
                .inner
                .store
                .keys(limit)
                .await
                .map_err(CatalogError::BackingStoreUnavailable)?;

            known.extend(keys.iter().filter_map(|key| match key.parse::<ProductId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(error = %e, "Ignoring non-product key in catalog bucket");
                    None
                }
            }));
            info!(count = known.len(), limit, "Populated known product ids");
        }
        Ok(known.clone())
    }

    async fn fetch(&self, id: ProductId) -> Result<Product, CatalogError> {
        debug!("Cache miss, fetching product record");
        let bytes = self
            .inner
            .store
            .get(&id.to_string())
            .await
            .map_err(CatalogError::BackingStoreUnavailable)?
            .ok_or(CatalogError::RecordNotFound(id))?;

        serde_json::from_slice(&bytes).map_err(|e| CatalogError::Decode {
            id,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Key-value store that lists a fixed key set and counts fetches.
    #[derive(Default)]
    struct FakeKv {
        keys: Vec<String>,
        values: HashMap<String, Vec<u8>>,
        delay: Duration,
        unavailable: AtomicBool,
        key_calls: AtomicUsize,
        get_calls: std::sync::Mutex<HashMap<String, usize>>,
    }

    impl FakeKv {
        fn with_products(ids: &[u64]) -> Self {
            let mut kv = Self::default();
            for id in ids {
                kv.keys.push(id.to_string());
                kv.values.insert(id.to_string(), product_json(*id));
            }
            kv
        }

        fn gets(&self, key: &str) -> usize {
            self.get_calls
                .lock()
                .unwrap()
                .get(key)
                .copied()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl KeyValueStore for FakeKv {
        async fn keys(&self, limit: usize) -> Result<Vec<String>, StoreError> {
            self.key_calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(self.keys.iter().take(limit).cloned().collect())
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            *self
                .get_calls
                .lock()
                .unwrap()
                .entry(key.to_string())
                .or_default() += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(self.values.get(key).cloned())
        }
    }

    fn product_json(id: u64) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": id,
            "productDisplayName": format!("Product {id}"),
            "masterCategory": "Apparel",
            "price": 999,
            "imageUrls": {"default": format!("{id}/default.jpg")}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_populates_known_ids_once() {
        let kv = Arc::new(FakeKv::with_products(&[1163, 1164, 1165]));
        let cache = ProductCache::new(kv.clone());

        let first = cache.list(2).await.unwrap();
        let second = cache.list(2).await.unwrap();

        assert_eq!(
            first.iter().map(|p| p.id.as_u64()).collect::<Vec<_>>(),
            vec![1163, 1164]
        );
        assert_eq!(first, second);
        assert_eq!(kv.key_calls.load(Ordering::SeqCst), 1);
        assert_eq!(kv.gets("1163"), 1);
        assert_eq!(kv.gets("1165"), 0);
    }

    #[tokio::test]
    async fn test_list_omits_missing_record() {
        let mut kv = FakeKv::with_products(&[1163]);
        kv.keys.insert(0, "43059".to_string());
        let cache = ProductCache::new(Arc::new(kv));

        let products = cache.list(2).await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, ProductId::new(1163));
    }

    #[tokio::test]
    async fn test_list_skips_malformed_record_and_foreign_keys() {
        let mut kv = FakeKv::with_products(&[1163]);
        kv.keys.push("7".to_string());
        kv.values.insert("7".to_string(), b"not json".to_vec());
        kv.keys.push("_meta".to_string());
        let cache = ProductCache::new(Arc::new(kv));

        let products = cache.list(10).await.unwrap();

        assert_eq!(products.len(), 1);
        assert!(matches!(
            cache.get(ProductId::new(7)).await,
            Err(CatalogError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_fails_when_store_unavailable_then_recovers() {
        let kv = Arc::new(FakeKv::with_products(&[1163]));
        kv.unavailable.store(true, Ordering::SeqCst);
        let cache = ProductCache::new(kv.clone());

        assert!(matches!(
            cache.list(2).await,
            Err(CatalogError::BackingStoreUnavailable(_))
        ));

        kv.unavailable.store(false, Ordering::SeqCst);
        assert_eq!(cache.list(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_fails_when_store_goes_down_after_sampling() {
        let kv = Arc::new(FakeKv::with_products(&[1163, 1164]));
        let cache = ProductCache::new(kv.clone());
        assert_eq!(cache.known_ids(2).await.unwrap().len(), 2);

        kv.unavailable.store(true, Ordering::SeqCst);

        assert!(matches!(
            cache.list(2).await,
            Err(CatalogError::BackingStoreUnavailable(StoreError::Unavailable(_)))
        ));
        assert_eq!(kv.key_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_cached() {
        let kv = Arc::new(FakeKv::default());
        let cache = ProductCache::new(kv.clone());

        for _ in 0..2 {
            assert!(matches!(
                cache.get(ProductId::new(43059)).await,
                Err(CatalogError::RecordNotFound(id)) if id.as_u64() == 43059
            ));
        }
        assert_eq!(kv.gets("43059"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_share_one_fetch() {
        let mut kv = FakeKv::with_products(&[1163]);
        kv.delay = Duration::from_millis(100);
        let kv = Arc::new(kv);
        let cache = ProductCache::new(kv.clone());
        let id = ProductId::new(1163);

        let (a, b, c) = tokio::join!(cache.get(id), cache.get(id), cache.list(1));

        assert_eq!(a.unwrap().id, id);
        assert_eq!(b.unwrap().id, id);
        assert_eq!(c.unwrap().len(), 1);
        assert_eq!(kv.gets("1163"), 1);
    }
}
