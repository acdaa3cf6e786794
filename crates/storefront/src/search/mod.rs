//! Product search against a remote Meilisearch index.
//!
//! The pipeline, leaves first:
//!
//! - [`translate`] turns a [`FilterSelection`](boutique_core::FilterSelection)
//!   into query text plus index filter clauses
//! - [`SearchBackend`] executes a [`SearchRequest`]; [`MeilisearchClient`] is
//!   the HTTP implementation
//! - [`FilterState`] holds one session's search intent
//! - [`SearchSession`] owns the debounce timer, loading/error/result state and
//!   the stale-response guard
//!
//! A session never searches on its own: callers mutate filters and then call
//! [`SearchSession::request_search`] explicitly.

mod client;
mod debounce;
mod filter_state;
mod session;
mod translator;

use std::time::Duration;

use thiserror::Error;

pub use client::{MeilisearchClient, RESULT_FIELDS, SearchBackend, SearchRequest, dispatch};
pub use debounce::Debouncer;
pub use filter_state::FilterState;
pub use session::{SearchOutcome, SearchSession, SearchState};
pub use translator::{SearchQuery, TranslationError, translate};

/// Tunables shared by sessions and the stateless search route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    /// Quiescence window before a requested search runs.
    pub debounce: Duration,
    /// Maximum number of hits per search.
    pub result_limit: usize,
    /// Upper bound on one search index call.
    pub timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            result_limit: 20,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Search errors.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The search index could not be reached.
    #[error("Search service unavailable: {0}")]
    Unavailable(String),

    /// The search index rejected a well-formed query.
    #[error("Search failed: {0}")]
    QueryFailed(String),

    /// The search index did not answer in time.
    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    /// The filter selection could not be rendered.
    #[error(transparent)]
    Translation(#[from] TranslationError),
}
