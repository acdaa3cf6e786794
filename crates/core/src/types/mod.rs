//! Core types for Boutique.
//!
//! This module provides type-safe wrappers for catalog and search concepts.

pub mod asset_key;
pub mod filter;
pub mod id;
pub mod price;
pub mod product;

pub use asset_key::AssetKey;
pub use filter::{Facet, FacetValues, FilterSelection};
pub use id::{ParseIdError, ProductId};
pub use price::Price;
pub use product::{ImageUrls, Product};
