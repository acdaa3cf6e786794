//! Opaque object-store key for product assets.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Key of a binary asset (typically a product image) in the object store.
///
/// Keys are opaque: the storefront never interprets them beyond building the
/// conventional `"{id}/{variant}.jpg"` layout for variant lookups.
///
/// ```
/// use boutique_core::{AssetKey, ProductId};
///
/// let key = AssetKey::for_variant(ProductId::new(43059), "default");
/// assert_eq!(key.as_str(), "43059/default.jpg");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    /// File extension used for variant images.
    pub const VARIANT_EXTENSION: &'static str = "jpg";

    /// Wrap a raw object-store key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build the key of a product's image variant (e.g. `"front"`).
    #[must_use]
    pub fn for_variant(id: ProductId, variant: &str) -> Self {
        Self(format!("{id}/{variant}.{}", Self::VARIANT_EXTENSION))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for AssetKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_variant() {
        let key = AssetKey::for_variant(ProductId::new(1628), "back");
        assert_eq!(key.to_string(), "1628/back.jpg");
    }

    #[test]
    fn test_keys_are_opaque() {
        let key = AssetKey::from("43059/default.jpg");
        assert_eq!(key.as_str(), "43059/default.jpg");
        assert_eq!(key.into_inner(), "43059/default.jpg");
    }
}
