//! Filter selection → Meilisearch filter expression.
//!
//! Each non-empty facet becomes one clause, `<attribute> IN ["v1", "v2"]`,
//! in facet declaration order. Values are always quoted through [`quote`],
//! never interpolated raw.

use core::fmt;

use boutique_core::{Facet, FacetValues, FilterSelection};
use thiserror::Error;

/// A facet value that cannot be embedded in a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("{facet} value {value:?} contains a control character")]
    ControlCharacter { facet: Facet, value: String },
}

/// Rendered search intent: query text plus filter clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free text, passed through unchanged. Empty matches everything.
    pub text: String,
    /// One clause per non-empty facet, in facet declaration order.
    pub filter: Vec<String>,
}

/// Render `selection` into a [`SearchQuery`].
///
/// Pure: the same selection always yields the same output.
///
/// # Errors
///
/// Returns `TranslationError::ControlCharacter` if a facet value contains a
/// control character.
pub fn translate(selection: &FilterSelection) -> Result<SearchQuery, TranslationError> {
    let filter = selection
        .active_facets()
        .map(|(facet, values)| FilterClause::new(facet, values).map(|clause| clause.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SearchQuery {
        text: selection.query.clone(),
        filter,
    })
}

/// One `IN` clause with values already quoted.
struct FilterClause {
    facet: Facet,
    quoted: Vec<String>,
}

impl FilterClause {
    fn new(facet: Facet, values: &FacetValues) -> Result<Self, TranslationError> {
        let quoted = values
            .iter()
            .map(|value| quote(value).ok_or_else(|| TranslationError::ControlCharacter {
                facet,
                value: value.to_string(),
            }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { facet, quoted })
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} IN [{}]", self.facet.field_name(), self.quoted.join(", "))
    }
}

/// Double-quote `value`, escaping backslashes and quotes.
///
/// Returns `None` for values containing control characters.
fn quote(value: &str) -> Option<String> {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_control() => return None,
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Some(quoted)
}
