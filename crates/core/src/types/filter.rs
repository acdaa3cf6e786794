//! Search intent: free-text query plus per-facet selected values.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A multi-valued filter dimension the user can narrow results by.
///
/// Declaration order is the order filter clauses are emitted in, so adding a
/// facet only requires a new variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    Gender,
    MasterCategory,
    SubCategory,
    BaseColour,
}

impl Facet {
    /// All facets, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Gender,
        Self::MasterCategory,
        Self::SubCategory,
        Self::BaseColour,
    ];

    /// Attribute name in product records and the search index.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::MasterCategory => "masterCategory",
            Self::SubCategory => "subCategory",
            Self::BaseColour => "baseColour",
        }
    }

    /// Parse from an attribute name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|facet| facet.field_name() == s)
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Selected values for one facet.
///
/// Behaves as a set (no duplicates) but keeps insertion order so toggling is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FacetValues(Vec<String>);

impl FacetValues {
    /// Remove `value` if present, otherwise append it.
    pub fn toggle(&mut self, value: &str) {
        if let Some(pos) = self.0.iter().position(|v| v == value) {
            self.0.remove(pos);
        } else {
            self.0.push(value.to_owned());
        }
    }

    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for FacetValues {
    fn from(values: Vec<String>) -> Self {
        let mut deduped = Self::default();
        for value in values {
            if !deduped.contains(&value) {
                deduped.0.push(value);
            }
        }
        deduped
    }
}

impl From<FacetValues> for Vec<String> {
    fn from(values: FacetValues) -> Self {
        values.0
    }
}

/// The user's current search intent.
///
/// Serializes with one array per facet, e.g.
/// `{"query": "", "gender": ["Male"], "masterCategory": [], ...}`.
/// Equality ignores facets whose value set is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub query: String,
    #[serde(flatten, default)]
    facets: BTreeMap<Facet, FacetValues>,
}

impl FilterSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper to select several values of a facet.
    #[must_use]
    pub fn with_values<I, S>(mut self, facet: Facet, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for value in values {
            let entry = self.facets.entry(facet).or_default();
            if !entry.contains(value.as_ref()) {
                entry.toggle(value.as_ref());
            }
        }
        self
    }

    /// Builder-style helper to set the free-text query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Selected values for `facet` (empty if none).
    #[must_use]
    pub fn values(&self, facet: Facet) -> &[String] {
        self.facets
            .get(&facet)
            .map(FacetValues::as_slice)
            .unwrap_or_default()
    }

    /// Toggle `value` in `facet`, leaving other facets untouched.
    pub fn toggle(&mut self, facet: Facet, value: &str) {
        let entry = self.facets.entry(facet).or_default();
        entry.toggle(value);
        if entry.is_empty() {
            self.facets.remove(&facet);
        }
    }

    /// Non-empty facets in declaration order.
    pub fn active_facets(&self) -> impl Iterator<Item = (Facet, &FacetValues)> {
        self.facets
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(facet, values)| (*facet, values))
    }

    /// True when the query is blank and no facet has a selected value.
    ///
    /// Whitespace-only queries count as blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.active_facets().next().is_none()
    }

    /// Reset the query and every facet.
    pub fn clear(&mut self) {
        self.query.clear();
        self.facets.clear();
    }
}

impl PartialEq for FilterSelection {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.active_facets().eq(other.active_facets())
    }
}

impl Eq for FilterSelection {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_restores_state() {
        for facet in Facet::ALL {
            let original = FilterSelection::new().with_values(Facet::Gender, ["Female"]);
            let mut selection = original.clone();
            selection.toggle(facet, "Blue");
            selection.toggle(facet, "Blue");
            assert_eq!(selection, original, "facet {facet}");
        }
    }

    #[test]
    fn test_toggle_does_not_touch_other_facets() {
        let mut selection = FilterSelection::new().with_values(Facet::BaseColour, ["Red"]);
        selection.toggle(Facet::Gender, "Male");
        assert_eq!(selection.values(Facet::BaseColour), ["Red"]);
        assert_eq!(selection.values(Facet::Gender), ["Male"]);
    }

    #[test]
    fn test_toggle_preserves_insertion_order() {
        let mut selection = FilterSelection::new();
        selection.toggle(Facet::BaseColour, "Red");
        selection.toggle(Facet::BaseColour, "Blue");
        selection.toggle(Facet::BaseColour, "Green");
        selection.toggle(Facet::BaseColour, "Blue");
        assert_eq!(selection.values(Facet::BaseColour), ["Red", "Green"]);
    }

    #[test]
    fn test_is_empty() {
        assert!(FilterSelection::new().is_empty());
        assert!(FilterSelection::new().with_query("   ").is_empty());
        assert!(!FilterSelection::new().with_query("shirt").is_empty());
        assert!(
            !FilterSelection::new()
                .with_values(Facet::SubCategory, ["Shoes"])
                .is_empty()
        );
    }

    #[test]
    fn test_clear() {
        let mut selection = FilterSelection::new()
            .with_query("shirt")
            .with_values(Facet::Gender, ["Male"]);
        selection.clear();
        assert!(selection.is_empty());
        assert!(selection.values(Facet::Gender).is_empty());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"query":"","gender":["Male","Male"],"masterCategory":[],"subCategory":[],"baseColour":[]}"#;
        let selection: FilterSelection = serde_json::from_str(json).unwrap();
        assert_eq!(selection.values(Facet::Gender), ["Male"]);
        assert!(selection.values(Facet::MasterCategory).is_empty());
        assert_eq!(
            selection.active_facets().map(|(f, _)| f).collect::<Vec<_>>(),
            vec![Facet::Gender]
        );
    }

    #[test]
    fn test_facet_parse() {
        assert_eq!(Facet::parse("baseColour"), Some(Facet::BaseColour));
        assert_eq!(Facet::parse("colour"), None);
    }
}
