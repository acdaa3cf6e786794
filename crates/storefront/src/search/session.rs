//! Per-visitor search session.
//!
//! A session owns one [`FilterState`], one debounce timer and the observable
//! [`SearchState`]. Every dispatch, including short-circuits and clears,
//! takes a fresh generation number; a response is applied only if its
//! generation is still the latest when it arrives, so a slow answer to an
//! old query can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use boutique_core::{Facet, FilterSelection, Product};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use super::{Debouncer, FilterState, SearchBackend, SearchSettings, dispatch};

/// What a session currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// A dispatched search has not been answered yet.
    pub loading: bool,
    /// Message from the last failed search. Cleared when a new search starts.
    pub error: Option<String>,
    /// Hits of the last applied search, in index order.
    pub results: Vec<Product>,
}

/// How one dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results were applied.
    Completed,
    /// The error was applied and results were cleared.
    Failed,
    /// The selection was empty; results were cleared without a backend call.
    ShortCircuited,
    /// A newer dispatch superseded this one; nothing was applied.
    StaleResponseDiscarded,
}

/// One visitor's search session.
///
/// Cheaply cloneable; clones share the same state. Requires a Tokio runtime.
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: Arc<dyn SearchBackend>,
    settings: SearchSettings,
    filters: Mutex<FilterState>,
    state: watch::Sender<SearchState>,
    debouncer: Debouncer,
    generation: AtomicU64,
}

impl SearchSession {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>, settings: SearchSettings) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            inner: Arc::new(SessionInner {
                backend,
                settings,
                filters: Mutex::new(FilterState::new()),
                state,
                debouncer: Debouncer::new(settings.debounce),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current filter selection.
    #[must_use]
    pub fn filters(&self) -> FilterSelection {
        self.inner.filters().get()
    }

    pub fn set_query_text(&self, text: impl Into<String>) {
        self.inner.filters().set_query_text(text);
    }

    pub fn toggle_facet_value(&self, facet: Facet, value: &str) {
        self.inner.filters().toggle_facet_value(facet, value);
    }

    /// Reset filters and results, and drop any pending or in-flight search.
    pub fn clear_filters(&self) {
        self.inner.filters().clear();
        self.inner.debouncer.cancel();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(SearchState::default());
    }

    /// Snapshot of the observable state.
    #[must_use]
    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn results(&self) -> Vec<Product> {
        self.inner.state.borrow().results.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    /// Search the current selection once the debounce window passes without
    /// another request.
    ///
    /// The selection is captured now; later filter edits need a new request.
    pub fn request_search(&self) {
        let selection = self.filters();
        let session: Weak<SessionInner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(async move {
            if let Some(inner) = session.upgrade() {
                let outcome = inner.run(selection).await;
                debug!(?outcome, "Debounced search finished");
            }
        });
    }

    /// Search the current selection immediately, cancelling any pending
    /// debounced request.
    pub async fn search_now(&self) -> SearchOutcome {
        self.inner.debouncer.cancel();
        let selection = self.filters();
        self.inner.run(selection).await
    }

    /// Drop a pending debounced request. Returns whether one was waiting.
    pub fn cancel_pending(&self) -> bool {
        self.inner.debouncer.cancel()
    }

    /// Whether a debounced request is waiting to fire.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }
}

impl SessionInner {
    fn filters(&self) -> MutexGuard<'_, FilterState> {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    #[instrument(skip(self, selection), fields(q = %selection.query, generation = tracing::field::Empty))]
    async fn run(&self, selection: FilterSelection) -> SearchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("generation", generation);

        if selection.is_empty() {
            self.state.send_if_modified(|state| {
                if !self.is_current(generation) {
                    return false;
                }
                *state = SearchState::default();
                true
            });
            debug!("Empty selection, skipping search");
            return SearchOutcome::ShortCircuited;
        }

        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            state.loading = true;
            state.error = None;
            true
        });

        let result = dispatch(self.backend.as_ref(), &selection, &self.settings).await;

        let mut outcome = SearchOutcome::StaleResponseDiscarded;
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            state.loading = false;
            match result {
                Ok(products) => {
                    debug!(hits = products.len(), "Applying search results");
                    state.results = products;
                    state.error = None;
                    outcome = SearchOutcome::Completed;
                }
                Err(e) => {
                    warn!(error = %e, "Search failed");
                    state.results.clear();
                    state.error = Some(e.to_string());
                    outcome = SearchOutcome::Failed;
                }
            }
            true
        });

        if outcome == SearchOutcome::StaleResponseDiscarded {
            debug!("Discarding stale search response");
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::search::{SearchError, SearchRequest};

    /// Backend that answers each query with one product named after it.
    #[derive(Default)]
    struct ScriptedBackend {
        requests: Mutex<Vec<SearchRequest>>,
        delays: HashMap<String, Duration>,
        fail: AtomicBool,
    }

    impl ScriptedBackend {
        fn with_delays(delays: &[(&str, u64)]) -> Self {
            Self {
                delays: delays
                    .iter()
                    .map(|(q, ms)| ((*q).to_string(), Duration::from_millis(*ms)))
                    .collect(),
                ..Self::default()
            }
        }

        fn queries(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.q.clone())
                .collect()
        }
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, SearchError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delays.get(&request.q) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(SearchError::QueryFailed("index not found".to_string()));
            }
            Ok(vec![named_product(&request.q)])
        }
    }

    fn named_product(name: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "productDisplayName": name,
        }))
        .unwrap()
    }

    fn session(backend: &Arc<ScriptedBackend>) -> SearchSession {
        SearchSession::new(backend.clone(), SearchSettings::default())
    }

    fn names(session: &SearchSession) -> Vec<String> {
        session
            .results()
            .into_iter()
            .map(|p| p.product_display_name)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_to_last_request() {
        let backend = Arc::new(ScriptedBackend::default());
        let session = session(&backend);

        for q in ["s", "sh", "shi", "shirt"] {
            session.set_query_text(q);
            session.request_search();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(backend.queries().is_empty());
        assert!(session.is_pending());

        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(backend.queries(), vec!["shirt"]);
        assert_eq!(names(&session), vec!["shirt"]);
        assert!(!session.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_captures_selection_at_request_time() {
        let backend = Arc::new(ScriptedBackend::default());
        let session = session(&backend);

        session.set_query_text("boots");
        session.request_search();
        session.set_query_text("sandals");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(backend.queries(), vec!["boots"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_selection_short_circuits() {
        let backend = Arc::new(ScriptedBackend::default());
        let session = session(&backend);

        session.set_query_text("watch");
        assert_eq!(session.search_now().await, SearchOutcome::Completed);
        assert_eq!(names(&session), vec!["watch"]);

        session.set_query_text("   ");
        session.request_search();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(backend.queries(), vec!["watch"]);
        assert!(session.results().is_empty());
        assert!(!session.is_loading());
        assert_eq!(session.search_now().await, SearchOutcome::ShortCircuited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("slow", 500), ("fast", 10)]));
        let session = session(&backend);

        session.set_query_text("slow");
        let slow = tokio::spawn({
            let session = session.clone();
            async move { session.search_now().await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;

        session.set_query_text("fast");
        assert_eq!(session.search_now().await, SearchOutcome::Completed);
        assert_eq!(names(&session), vec!["fast"]);

        assert_eq!(slow.await.unwrap(), SearchOutcome::StaleResponseDiscarded);
        assert_eq!(names(&session), vec!["fast"]);
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_while_in_flight() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("jeans", 100)]));
        let session = session(&backend);
        let mut updates = session.subscribe();

        session.set_query_text("jeans");
        let search = tokio::spawn({
            let session = session.clone();
            async move { session.search_now().await }
        });

        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().loading);
        assert!(session.is_loading());

        assert_eq!(search.await.unwrap(), SearchOutcome::Completed);
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported_as_failure() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("belt", 60_000)]));
        let session = SearchSession::new(
            backend.clone(),
            SearchSettings {
                timeout: Duration::from_secs(1),
                ..SearchSettings::default()
            },
        );

        session.set_query_text("belt");
        assert_eq!(session.search_now().await, SearchOutcome::Failed);
        assert!(session.error().unwrap().contains("timed out"));
        assert!(!session.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_clears_results_and_next_search_clears_error() {
        let backend = Arc::new(ScriptedBackend::default());
        let session = session(&backend);

        session.toggle_facet_value(Facet::Gender, "Women");
        assert_eq!(session.search_now().await, SearchOutcome::Completed);
        assert_eq!(session.results().len(), 1);

        backend.fail.store(true, Ordering::SeqCst);
        assert_eq!(session.search_now().await, SearchOutcome::Failed);
        assert!(session.results().is_empty());
        assert_eq!(
            session.error().as_deref(),
            Some("Search failed: index not found")
        );

        backend.fail.store(false, Ordering::SeqCst);
        assert_eq!(session.search_now().await, SearchOutcome::Completed);
        assert_eq!(session.error(), None);
        assert_eq!(session.results().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_filters_resets_and_cancels() {
        let backend = Arc::new(ScriptedBackend::with_delays(&[("scarf", 200)]));
        let session = session(&backend);

        session.set_query_text("scarf");
        let in_flight = tokio::spawn({
            let session = session.clone();
            async move { session.search_now().await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;

        session.request_search();
        session.clear_filters();

        assert!(session.filters().is_empty());
        assert!(!session.is_pending());
        assert_eq!(session.state(), SearchState::default());

        assert_eq!(
            in_flight.await.unwrap(),
            SearchOutcome::StaleResponseDiscarded
        );
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(backend.queries(), vec!["scarf"]);
        assert_eq!(session.state(), SearchState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_now_cancels_pending_request() {
        let backend = Arc::new(ScriptedBackend::default());
        let session = session(&backend);

        session.set_query_text("cap");
        session.request_search();
        assert!(session.is_pending());

        assert_eq!(session.search_now().await, SearchOutcome::Completed);
        assert!(!session.cancel_pending());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(backend.queries(), vec!["cap"]);
    }
}
