//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Health check
//!
//! # Images
//! GET  /api/images/{key}             - Image by percent-encoded object key
//! GET  /api/images/{id}/{variant}    - Image by product id and variant name
//!
//! # Products
//! GET  /api/products                 - Catalog sample
//! GET  /api/products/{id}            - Product by id
//!
//! # Search
//! POST /api/search                   - Search with a JSON filter selection
//! ```

pub mod images;
pub mod products;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the image routes router.
pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/{key}", get(images::show))
        .route("/{id}/{variant}", get(images::variant))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/images", image_routes())
        .nest("/api/products", product_routes())
        .route("/api/search", post(search::search))
}
