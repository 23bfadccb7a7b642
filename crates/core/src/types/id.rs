//! Newtype identifiers for catalog items and anonymous voters.
//!
//! Both identifiers are opaque strings supplied by callers. Use the
//! `define_string_id!` macro to create wrappers that prevent accidentally
//! passing a voter id where an item id is expected.

/// Errors that can occur when parsing an identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("{kind} cannot be empty")]
    Empty {
        /// Wire name of the identifier (e.g. `itemId`).
        kind: &'static str,
    },
    /// The input string is too long.
    #[error("{kind} must be at most {max} bytes")]
    TooLong {
        /// Wire name of the identifier (e.g. `itemId`).
        kind: &'static str,
        /// Maximum allowed length in bytes.
        max: usize,
    },
}

impl IdError {
    /// Wire name of the identifier that failed to parse.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty { kind } | Self::TooLong { kind, .. } => kind,
        }
    }
}

/// Macro to define a type-safe string identifier.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` with `#[serde(transparent)]`, and a `Deserialize` that
///   rejects strings `parse()` would reject
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Validating constructor `parse()` (non-empty, at most `MAX_LENGTH` bytes)
/// - `from_query()` which treats an empty value as absent
/// - `Display`, `FromStr`, `TryFrom<String>`, `AsRef<str>` and `Borrow<str>` implementations
/// - `sqlx` `Type`, `Encode`, `Decode` and `PgHasArrayType` implementations (with `postgres` feature)
///
/// The second argument is the identifier's wire name, used in error messages.
///
/// # Example
///
/// ```rust
/// # use lovevote_core::define_string_id;
/// define_string_id!(ShelfId, "shelfId");
/// define_string_id!(BookId, "bookId");
///
/// let shelf = ShelfId::parse("top").unwrap();
/// let book = BookId::parse("top").unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: ShelfId = book;
/// # let _ = (shelf, book);
/// ```
#[macro_export]
macro_rules! define_string_id {
    ($name:ident, $kind:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Maximum length of the identifier in bytes.
            pub const MAX_LENGTH: usize = 256;

            /// Wire name of the identifier.
            pub const KIND: &'static str = $kind;

            /// Parse an identifier from a string.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is empty or longer than
            /// `MAX_LENGTH` bytes.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::IdError> {
                Self::validate(s)?;
                Ok(Self(s.to_owned()))
            }

            fn validate(s: &str) -> ::core::result::Result<(), $crate::IdError> {
                if s.is_empty() {
                    return Err($crate::IdError::Empty { kind: $kind });
                }
                if s.len() > Self::MAX_LENGTH {
                    return Err($crate::IdError::TooLong {
                        kind: $kind,
                        max: Self::MAX_LENGTH,
                    });
                }
                Ok(())
            }

            /// Parse an optional query value, treating an empty string as absent.
            ///
            /// # Errors
            ///
            /// Returns an error if a non-empty value is longer than `MAX_LENGTH` bytes.
            pub fn from_query(
                value: Option<&str>,
            ) -> ::core::result::Result<Option<Self>, $crate::IdError> {
                match value {
                    None | Some("") => Ok(None),
                    Some(s) => Self::parse(s).map(Some),
                }
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier, returning the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl ::core::convert::TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(s: String) -> ::core::result::Result<Self, Self::Error> {
                Self::validate(&s)?;
                Ok(Self(s))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::try_from(s).map_err(<D::Error as ::serde::de::Error>::custom)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::postgres::PgHasArrayType for $name {
            fn array_type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::postgres::PgHasArrayType>::array_type_info()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_string_id!(ItemId, "itemId");
define_string_id!(AnonymousId, "userId");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let id = ItemId::parse("raycast-clipboard").unwrap();
        assert_eq!(id.as_str(), "raycast-clipboard");
        assert_eq!(id.to_string(), "raycast-clipboard");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(
            ItemId::parse(""),
            Err(IdError::Empty { kind: "itemId" })
        );
    }

    #[test]
    fn test_parse_too_long() {
        let long = "x".repeat(AnonymousId::MAX_LENGTH + 1);
        let err = AnonymousId::parse(&long).unwrap_err();
        assert_eq!(err.to_string(), "userId must be at most 256 bytes");
    }

    #[test]
    fn test_parse_max_length_ok() {
        let max = "x".repeat(ItemId::MAX_LENGTH);
        assert!(ItemId::parse(&max).is_ok());
    }

    #[test]
    fn test_from_query_treats_empty_as_absent() {
        assert_eq!(ItemId::from_query(None).unwrap(), None);
        assert_eq!(ItemId::from_query(Some("")).unwrap(), None);
        assert_eq!(
            ItemId::from_query(Some("abc")).unwrap(),
            Some(ItemId::parse("abc").unwrap())
        );
    }

    #[test]
    fn test_serde_transparent() {
        let id = AnonymousId::parse("u1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u1\"");
        let back: AnonymousId = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_deserialize_validates() {
        let err = serde_json::from_str::<ItemId>("\"\"").unwrap_err();
        assert!(err.to_string().contains("itemId cannot be empty"), "{err}");

        let long = format!("\"{}\"", "x".repeat(AnonymousId::MAX_LENGTH + 1));
        assert!(serde_json::from_str::<AnonymousId>(&long).is_err());
    }

    #[test]
    fn test_deserialize_validates_map_keys() {
        use std::collections::BTreeMap;

        let ok: BTreeMap<ItemId, u64> = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        assert_eq!(ok.get("a"), Some(&1));
        assert!(serde_json::from_str::<BTreeMap<ItemId, u64>>(r#"{"": 1}"#).is_err());
    }
}
