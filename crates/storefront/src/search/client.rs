//! Search index client.
//!
//! [`SearchBackend`] is the seam sessions and routes search through.
//! [`MeilisearchClient`] implements it over the Meilisearch HTTP API:
//!
//! ```text
//! POST {url}/indexes/{index}/search
//! Authorization: Bearer {api key}
//! {"q": "...", "limit": 20, "filter": ["gender IN [\"Male\"]"], "attributesToRetrieve": [...]}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use boutique_core::{FilterSelection, Product};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use url::Url;

use super::{SearchError, SearchQuery, SearchSettings, translate};

/// Fields requested for every hit.
pub const RESULT_FIELDS: [&str; 9] = [
    "id",
    "productDisplayName",
    "brandName",
    "masterCategory",
    "imageUrls",
    "subCategory",
    "baseColour",
    "season",
    "price",
];

/// Body of one search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub q: String,
    pub limit: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<String>,
    pub attributes_to_retrieve: Vec<String>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: SearchQuery, limit: usize) -> Self {
        Self {
            q: query.text,
            limit,
            filter: query.filter,
            attributes_to_retrieve: RESULT_FIELDS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Something that can answer a [`SearchRequest`].
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run one search and return its hits in index order.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, SearchError>;
}

/// Render `selection`, run it against `backend`, and bound the call by
/// `settings.timeout`.
///
/// # Errors
///
/// Returns `SearchError::Translation` if the selection cannot be rendered,
/// `SearchError::Timeout` if the backend does not answer in time, or
/// whatever the backend itself returns.
pub async fn dispatch(
    backend: &dyn SearchBackend,
    selection: &FilterSelection,
    settings: &SearchSettings,
) -> Result<Vec<Product>, SearchError> {
    let request = SearchRequest::new(translate(selection)?, settings.result_limit);

    tokio::time::timeout(settings.timeout, backend.search(&request))
        .await
        .map_err(|_| SearchError::Timeout(settings.timeout))?
}

/// Meilisearch HTTP client for one index.
#[derive(Clone)]
pub struct MeilisearchClient {
    inner: Arc<MeilisearchClientInner>,
}

struct MeilisearchClientInner {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<Product>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

impl MeilisearchClient {
    #[must_use]
    pub fn new(url: &Url, index: &str, api_key: Option<SecretString>) -> Self {
        let endpoint = format!(
            "{}/indexes/{index}/search",
            url.as_str().trim_end_matches('/')
        );

        Self {
            inner: Arc::new(MeilisearchClientInner {
                client: reqwest::Client::new(),
                endpoint,
                api_key,
            }),
        }
    }

    /// Full URL searches are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }
}

#[async_trait]
impl SearchBackend for MeilisearchClient {
    #[instrument(skip(self, request), fields(q = %request.q, filters = request.filter.len()))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, SearchError> {
        let mut call = self.inner.client.post(&self.inner.endpoint).json(request);
        if let Some(key) = &self.inner.api_key {
            call = call.bearer_auth(key.expose_secret());
        }

        let response = call.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Search index returned non-success status"
            );
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map_or_else(|_| format!("HTTP {status}"), |e| e.message);
            return Err(SearchError::QueryFailed(message));
        }

        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse search response"
            );
            SearchError::QueryFailed(format!("invalid search response: {e}"))
        })?;

        debug!(hits = parsed.hits.len(), "Search completed");
        Ok(parsed.hits)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn transport_error(e: reqwest::Error) -> SearchError {
    SearchError::Unavailable(e.to_string())
}
