//! Application state shared across handlers.

use std::sync::Arc;

use crate::assets::AssetResolver;
use crate::catalog::ProductCache;
use crate::config::BoutiqueConfig;
use crate::search::{MeilisearchClient, SearchBackend, SearchSession, SearchSettings};
use crate::store::{NatsConnection, NatsKeyValue, NatsObjectStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// process-wide caches and the search backend.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    catalog: ProductCache,
    assets: AssetResolver,
    search: Arc<dyn SearchBackend>,
    search_settings: SearchSettings,
    catalog_sample_size: usize,
    nats: Option<Arc<NatsConnection>>,
}

impl AppState {
    /// Assemble state from already constructed parts.
    #[must_use]
    pub fn new(
        catalog: ProductCache,
        assets: AssetResolver,
        search: Arc<dyn SearchBackend>,
        search_settings: SearchSettings,
        catalog_sample_size: usize,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                catalog,
                assets,
                search,
                search_settings,
                catalog_sample_size,
                nats: None,
            }),
        }
    }

    /// Wire NATS-backed caches and the Meilisearch client from configuration.
    ///
    /// No connection is made here; the NATS connection is established on
    /// first use.
    #[must_use]
    pub fn from_config(config: &BoutiqueConfig) -> Self {
        let nats = Arc::new(NatsConnection::new(
            config.store.nats_url.clone(),
            config.store.timeout,
        ));
        let catalog = ProductCache::new(Arc::new(NatsKeyValue::new(
            nats.clone(),
            config.store.product_bucket.clone(),
        )));
        let assets = AssetResolver::new(Arc::new(NatsObjectStore::new(
            nats.clone(),
            config.store.image_bucket.clone(),
        )));
        let search = Arc::new(MeilisearchClient::new(
            &config.search.url,
            &config.search.index,
            config.search.api_key.clone(),
        ));

        Self {
            inner: Arc::new(AppStateInner {
                catalog,
                assets,
                search,
                search_settings: config.search.settings,
                catalog_sample_size: config.store.catalog_sample_size,
                nats: Some(nats),
            }),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &ProductCache {
        &self.inner.catalog
    }

    #[must_use]
    pub fn assets(&self) -> &AssetResolver {
        &self.inner.assets
    }

    #[must_use]
    pub fn search(&self) -> &dyn SearchBackend {
        self.inner.search.as_ref()
    }

    #[must_use]
    pub fn search_settings(&self) -> &SearchSettings {
        &self.inner.search_settings
    }

    /// Number of products `GET /api/products` lists.
    #[must_use]
    pub fn catalog_sample_size(&self) -> usize {
        self.inner.catalog_sample_size
    }

    /// Start a search session over the shared backend.
    #[must_use]
    pub fn new_session(&self) -> SearchSession {
        SearchSession::new(self.inner.search.clone(), self.inner.search_settings)
    }

    /// Drain the NATS connection, if one was configured.
    pub async fn close(&self) {
        if let Some(nats) = &self.inner.nats {
            nats.close().await;
        }
    }
}
