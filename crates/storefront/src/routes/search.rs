//! Stateless search endpoint.

use axum::{Json, extract::State};
use boutique_core::{FilterSelection, Product};
use tracing::{debug, instrument};

use crate::error::{Result, add_breadcrumb};
use crate::search::dispatch;
use crate::state::AppState;

/// Search with a JSON [`FilterSelection`] body.
///
/// An empty selection returns `[]` without calling the search index.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Json(selection): Json<FilterSelection>,
) -> Result<Json<Vec<Product>>> {
    if selection.is_empty() {
        debug!("Empty selection, skipping search");
        return Ok(Json(Vec::new()));
    }

    add_breadcrumb("search", "Searched products", Some(&[("q", selection.query.as_str())]));

    let hits = dispatch(state.search(), &selection, state.search_settings()).await?;
    Ok(Json(hits))
}
