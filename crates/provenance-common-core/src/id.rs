//! Strongly-typed identifiers.
//!
//! Ledger rows are keyed by SQLite rowids, so identifiers wrap an `i64`.
//! Insertion order equals identifier order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A strongly-typed rowid wrapper.
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[doc = concat!("A row identifier, displayed with prefix '", $prefix, "_' in debug output.")]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw rowid.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Parse from string (with or without prefix).
            pub fn parse(s: &str) -> Result<Self, IdParseError> {
                let s = s.trim();
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                let raw: i64 = s.parse().map_err(|_| IdParseError::InvalidFormat)?;
                if raw <= 0 {
                    return Err(IdParseError::OutOfRange);
                }
                Ok(Self(raw))
            }

            /// Get the raw rowid.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}_{})", stringify!($name), $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

/// Error parsing an ID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    /// The ID format is invalid.
    #[error("invalid ID format")]
    InvalidFormat,

    /// Rowids start at 1.
    #[error("ID must be a positive integer")]
    OutOfRange,
}

define_id!(FileId, "file");
define_id!(RecordId, "rec");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_roundtrip() {
        let id = FileId::new(42);
        let parsed = FileId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_with_prefix() {
        assert_eq!(FileId::parse("file_7").unwrap(), FileId::new(7));
        assert_eq!(RecordId::parse("rec_3").unwrap(), RecordId::new(3));
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert_eq!(FileId::parse("0"), Err(IdParseError::OutOfRange));
        assert_eq!(FileId::parse("-4"), Err(IdParseError::OutOfRange));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(FileId::parse("abc"), Err(IdParseError::InvalidFormat));
        assert_eq!(FileId::parse("rec_3"), Err(IdParseError::InvalidFormat));
    }

    #[test]
    fn test_id_serialization_is_transparent() {
        let id = RecordId::new(9);
        assert_eq!(serde_json::to_string(&id).unwrap(), "9");
        let back: RecordId = serde_json::from_str("9").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", FileId::new(5)), "FileId(file_5)");
    }
}
