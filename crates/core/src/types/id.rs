//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.

/// Error returned when a string key cannot be parsed into an ID.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid id {input:?}: expected an unsigned integer")]
pub struct ParseIdError {
    /// The rejected input.
    pub input: String,
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `u64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_u64()`
/// - `FromStr` so store keys (`"43059"`) parse into IDs
///
/// # Example
///
/// ```rust
/// # use boutique_core::define_id;
/// define_id!(ProductId);
/// define_id!(BrandId);
///
/// let product_id: ProductId = "43059".parse().unwrap();
/// assert_eq!(product_id.as_u64(), 43059);
///
/// // These are different types, so this won't compile:
/// // let _: BrandId = product_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new ID from a u64 value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the underlying u64 value.
            #[must_use]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::ParseIdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| $crate::types::id::ParseIdError {
                        input: s.to_owned(),
                    })
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ProductId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_key() {
        let id: ProductId = "43059".parse().unwrap();
        assert_eq!(id, ProductId::new(43059));
        assert_eq!(id.to_string(), "43059");
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = "abc".parse::<ProductId>().unwrap_err();
        assert_eq!(err.input, "abc");
    }

    #[test]
    fn test_serde_transparent() {
        let id: ProductId = serde_json::from_str("1628").unwrap();
        assert_eq!(id.as_u64(), 1628);
        assert_eq!(serde_json::to_string(&id).unwrap(), "1628");
    }
}
