//! Product JSON handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use boutique_core::{Product, ProductId};
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// List the catalog sample.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().list(state.catalog_sample_size()).await?;
    Ok(Json(products))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get(id).await?))
}
