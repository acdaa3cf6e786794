//! Boutique Core - Shared types library.
//!
//! This crate provides the types shared by the storefront and its tests:
//! products and their image variants, search facets and filter selections.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, asset keys, prices, products and filter selections

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
