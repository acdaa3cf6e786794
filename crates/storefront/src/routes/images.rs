//! Product image handlers.
//!
//! Images addressed by their full object key are immutable and cached by
//! clients for a year. Variant URLs are resolved through the product id, so
//! they are cached for an hour.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use boutique_core::{AssetKey, ProductId};
use tracing::instrument;

use crate::assets::Asset;
use crate::error::Result;
use crate::state::AppState;

/// `Cache-Control` value for images served by object key.
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000";

/// `Cache-Control` value for images served by product variant.
pub const VARIANT_CACHE_CONTROL: &str = "public, max-age=3600";

/// Serve an image by its full object key.
///
/// Keys containing `/` must be percent-encoded (`1163%2Ffront.jpg`).
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(key): Path<String>) -> Result<Response> {
    let asset = state.assets().fetch(&AssetKey::new(key)).await?;
    Ok(image_response(asset, IMAGE_CACHE_CONTROL))
}

/// Serve the `{variant}` image of product `{id}`.
#[instrument(skip(state))]
pub async fn variant(
    State(state): State<AppState>,
    Path((id, variant)): Path<(ProductId, String)>,
) -> Result<Response> {
    let asset = state
        .assets()
        .fetch(&AssetKey::for_variant(id, &variant))
        .await?;
    Ok(image_response(asset, VARIANT_CACHE_CONTROL))
}

fn image_response(asset: Asset, cache_control: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, asset.content_type),
            (header::CACHE_CONTROL, cache_control.to_string()),
        ],
        asset.data,
    )
        .into_response()
}
