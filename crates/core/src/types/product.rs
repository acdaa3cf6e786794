//! Product records as stored in the catalog and returned by the search index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::asset_key::AssetKey;
use super::id::ProductId;
use super::price::Price;

/// A catalog product.
///
/// Immutable once fetched. The search index returns a projection of this
/// record, so every descriptive field defaults to empty when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub master_category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub article_type: String,
    #[serde(default)]
    pub base_colour: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub product_display_name: String,
    #[serde(default)]
    pub variant_name: String,
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub price: Option<Price>,
    /// Free-form attributes such as `"Pattern"` or `"Fabric"`.
    #[serde(default)]
    pub article_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_urls: ImageUrls,
}

impl Product {
    /// Key of the primary (`"default"`) image, if the product has one.
    #[must_use]
    pub fn primary_image(&self) -> Option<&AssetKey> {
        self.image_urls.variant(ImageUrls::DEFAULT)
    }
}

/// Image variant name → asset key (`"default"`, `"search"`, `"front"`, `"back"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageUrls(BTreeMap<String, AssetKey>);

impl ImageUrls {
    pub const DEFAULT: &'static str = "default";
    pub const SEARCH: &'static str = "search";
    pub const FRONT: &'static str = "front";
    pub const BACK: &'static str = "back";

    /// Look up the asset key for a variant.
    #[must_use]
    pub fn variant(&self, name: &str) -> Option<&AssetKey> {
        self.0.get(name)
    }

    /// Iterate variants in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetKey)> {
        self.0.iter().map(|(name, key)| (name.as_str(), key))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, AssetKey)> for ImageUrls {
    fn from_iter<I: IntoIterator<Item = (String, AssetKey)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
