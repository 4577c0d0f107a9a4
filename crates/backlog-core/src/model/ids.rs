//! Numeric identifiers for items, projects, sprints, and item types.
//!
//! All ids are store-assigned positive integers. They are kept as distinct
//! newtypes so a sprint id can never be passed where an item id is expected.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::{fmt, num::ParseIntError, str::FromStr};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                let raw: i64 = trimmed.parse().map_err(|source| ParseIdError {
                    kind: $label,
                    got: trimmed.to_string(),
                    source: Some(source),
                })?;
                if raw <= 0 {
                    return Err(ParseIdError {
                        kind: $label,
                        got: trimmed.to_string(),
                        source: None,
                    });
                }
                Ok(Self(raw))
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

numeric_id!(
    /// Stable identifier of a work item.
    ItemId,
    "item id"
);
numeric_id!(
    /// Identifier of a project; the first component of every scope.
    ProjectId,
    "project id"
);
numeric_id!(
    /// Identifier of a sprint (a version items can be planned into).
    SprintId,
    "sprint id"
);
numeric_id!(
    /// Identifier of an item type (story, epic, task, bug, ...).
    TypeId,
    "type id"
);

/// Error returned when an id cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{got}' (expected a positive integer)")]
pub struct ParseIdError {
    pub kind: &'static str,
    pub got: String,
    #[source]
    pub source: Option<ParseIntError>,
}

#[cfg(test)]
mod tests {
    use super::{ItemId, SprintId};

    #[test]
    fn parses_positive_integers_with_whitespace() {
        assert_eq!(" 42 ".parse::<ItemId>(), Ok(ItemId::new(42)));
    }

    #[test]
    fn rejects_non_numeric_and_non_positive() {
        let err = "story-7".parse::<ItemId>().unwrap_err();
        assert_eq!(err.kind, "item id");
        assert!(err.source.is_some());

        let err = "0".parse::<SprintId>().unwrap_err();
        assert_eq!(err.kind, "sprint id");
        assert!(err.source.is_none());
    }

    #[test]
    fn display_is_bare_number() {
        assert_eq!(ItemId::new(17).to_string(), "17");
    }
}
