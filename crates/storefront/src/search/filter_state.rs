//! One session's mutable search intent.

use boutique_core::{Facet, FilterSelection};

/// Canonical search intent for a session.
///
/// Mutations are pure state transitions; none of them triggers a search.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    selection: FilterSelection,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current selection.
    #[must_use]
    pub fn get(&self) -> FilterSelection {
        self.selection.clone()
    }

    /// Replace the free-text query only.
    pub fn set_query_text(&mut self, text: impl Into<String>) {
        self.selection.query = text.into();
    }

    /// Add `value` to `facet`, or remove it if already selected.
    pub fn toggle_facet_value(&mut self, facet: Facet, value: &str) {
        self.selection.toggle(facet, value);
    }

    /// Empty the query and every facet.
    pub fn clear(&mut self) {
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_query_text_keeps_facets() {
        let mut state = FilterState::new();
        state.toggle_facet_value(Facet::Gender, "Boys");
        state.set_query_text("tshirt");

        let selection = state.get();
        assert_eq!(selection.query, "tshirt");
        assert_eq!(selection.values(Facet::Gender), ["Boys"]);
    }

    #[test]
    fn test_toggle_is_idempotent_in_pairs() {
        let mut state = FilterState::new();
        state.toggle_facet_value(Facet::MasterCategory, "Footwear");
        let before = state.get();

        state.toggle_facet_value(Facet::MasterCategory, "Accessories");
        state.toggle_facet_value(Facet::MasterCategory, "Accessories");

        assert_eq!(state.get(), before);
    }

    #[test]
    fn test_clear() {
        let mut state = FilterState::new();
        state.set_query_text("watch");
        state.toggle_facet_value(Facet::BaseColour, "Black");
        state.clear();
        assert!(state.get().is_empty());
    }
}
