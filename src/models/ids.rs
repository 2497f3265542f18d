//! Newtype wrappers for entity identifiers.
//!
//! These prevent accidentally mixing up the internal account key with the
//! institution identifiers the API uses to address linked accounts.

use serde::{Deserialize, Deserializer, Serialize};

/// Macro to define a newtype ID wrapping a `Copy` inner type.
macro_rules! define_copy_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from the given value.
            #[inline]
            #[must_use]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Consumes the wrapper and returns the inner value.
            #[inline]
            #[must_use]
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

/// Macro to define a newtype ID wrapping a `String`.
///
/// The API is inconsistent about quoting identifiers, so deserialization
/// accepts a JSON string or a JSON integer and stores the textual form.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the given string.
            #[inline]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Returns a reference to the inner string.
            #[inline]
            #[must_use]
            pub fn as_inner(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner string.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            #[inline]
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                string_or_integer(deserializer).map(Self)
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

/// Either representation an identifier may arrive in.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrInteger {
    /// Quoted identifier.
    Text(String),
    /// Signed numeric identifier.
    Signed(i64),
    /// Unsigned numeric identifier beyond `i64::MAX`.
    Unsigned(u64),
}

/// Deserializes a string or integer into its textual form.
fn string_or_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StringOrInteger::deserialize(deserializer)? {
        StringOrInteger::Text(text) => text,
        StringOrInteger::Signed(number) => number.to_string(),
        StringOrInteger::Unsigned(number) => number.to_string(),
    })
}

define_copy_id! {
    /// Numeric identifier of the API user the credentials belong to.
    UserId(i64)
}

define_string_id! {
    /// Internal account key (`account-id`), used to join transactions to
    /// accounts. Formatted `"<login>/<name>"` by the API.
    AccountId
}

define_string_id! {
    /// External key identifying a linked financial account (`institution-id`).
    InstitutionId
}

define_string_id! {
    /// Identifier of the institution login an account was linked through.
    InstitutionLoginId
}

define_string_id! {
    /// Unique identifier for a transaction.
    TransactionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_serde_roundtrip() {
        let id = UserId::new(1_110_590_645);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "1110590645");
        let deserialized: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn account_id_deserializes_from_string() {
        let id: AccountId = serde_json::from_str(r#""nonce:comfy-cc/hdhehe""#).unwrap();
        assert_eq!(id.as_inner(), "nonce:comfy-cc/hdhehe");
    }

    #[test]
    fn institution_id_deserializes_from_integer() {
        let id: InstitutionId = serde_json::from_str("12345").unwrap();
        assert_eq!(id, InstitutionId::from("12345"));
    }

    #[test]
    fn institution_id_rejects_other_json() {
        let result = serde_json::from_str::<InstitutionId>("[1, 2]");
        assert!(result.is_err());
    }

    #[test]
    fn string_id_serializes_as_string() {
        let id = InstitutionLoginId::from("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""42""#);
    }

    #[test]
    fn id_display() {
        assert_eq!(AccountId::from("abc-123").to_string(), "abc-123");
        assert_eq!(UserId::new(99).to_string(), "99");
    }

    #[test]
    fn id_into_inner() {
        assert_eq!(UserId::new(7).into_inner(), 7);
        assert_eq!(TransactionId::from("t-1").into_inner(), "t-1");
    }
}
