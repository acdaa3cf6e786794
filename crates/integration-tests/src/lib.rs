//! Integration tests for the Boutique storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boutique-integration-tests
//! ```
//!
//! No external services are needed: the router is driven in-process with
//! `tower::ServiceExt::oneshot` over in-memory stores and a scripted search
//! backend. [`TestContext`] wires those together.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use boutique_core::Product;
use boutique_storefront::assets::AssetResolver;
use boutique_storefront::catalog::ProductCache;
use boutique_storefront::search::{SearchBackend, SearchError, SearchRequest, SearchSettings};
use boutique_storefront::state::AppState;
use boutique_storefront::store::{MemoryKeyValue, MemoryObjectStore, StoreError};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

/// Search backend that records requests and returns canned hits.
#[derive(Default)]
pub struct ScriptedSearch {
    hits: Vec<Product>,
    failure: Option<SearchError>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedSearch {
    #[must_use]
    pub fn returning(hits: Vec<Product>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing(error: SearchError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, SearchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.hits.clone()),
        }
    }
}

/// In-process storefront over in-memory backends.
pub struct TestContext {
    pub products: Arc<MemoryKeyValue>,
    pub images: Arc<MemoryObjectStore>,
    pub search: Arc<ScriptedSearch>,
    pub state: AppState,
}

impl TestContext {
    /// Context with empty stores and a search backend returning no hits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_search(ScriptedSearch::default())
    }

    #[must_use]
    pub fn with_search(search: ScriptedSearch) -> Self {
        let products = Arc::new(MemoryKeyValue::new());
        let images = Arc::new(MemoryObjectStore::new());
        let search = Arc::new(search);
        let state = AppState::new(
            ProductCache::new(products.clone()),
            AssetResolver::new(images.clone()),
            search.clone(),
            SearchSettings::default(),
            2,
        );
        Self {
            products,
            images,
            search,
            state,
        }
    }

    /// Store `product` as a JSON record under its id.
    ///
    /// # Errors
    ///
    /// Returns the store error if the record cannot be encoded.
    pub fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        self.products.insert_json(product.id.to_string(), product)
    }

    #[must_use]
    pub fn router(&self) -> Router {
        boutique_storefront::router(self.state.clone())
    }

    /// Send a GET request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails.
    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).expect("valid request"))
            .await
    }

    /// Send a POST request with a JSON body through the router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails.
    pub async fn post_json(&self, uri: &str, body: &serde_json::Value) -> Response {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a product from a JSON document.
///
/// # Panics
///
/// Panics if the document is not a valid product.
#[must_use]
pub fn product(json: serde_json::Value) -> Product {
    serde_json::from_value(json).expect("valid product")
}

/// Read a response body as bytes.
///
/// # Panics
///
/// Panics if the body cannot be read.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body")
        .to_vec()
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not valid JSON for `T`.
pub async fn body_json<T: DeserializeOwned>(response: Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

/// Assert a response status, showing the body on mismatch.
///
/// # Panics
///
/// Panics if the status differs from `expected`.
pub async fn assert_status(response: Response, expected: StatusCode) -> Response {
    if response.status() == expected {
        return response;
    }
    let status = response.status();
    let body = String::from_utf8_lossy(&body_bytes(response).await).into_owned();
    panic!("expected {expected}, got {status}: {body}");
}
