//! Error types for parsing definition files.

use thiserror::Error;

use crate::config::ConfigKey;
use crate::names::NameError;

/// A fatal problem in a definition file.
///
/// Parsing stops at the first error; there is no recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A table, column or entity name broke the identifier rules.
    #[error("invalid {context} name: {source}")]
    InvalidName {
        /// What the name was for ("column", "table", ...).
        context: &'static str,
        /// The underlying rule violation.
        #[source]
        source: NameError,
    },

    /// A column type has no storage mapping.
    #[error(
        "unsupported type '{0}'; add [ignore] to the end of the line to skip the column"
    )]
    UnsupportedType(String),

    /// `[nulls]` was used on a type with no nullable form.
    #[error(
        "type '{0}' cannot be nullable; nullable columns must be int, int32, int64, uint32, \
         float32, float64, bool, time.Time, string or []byte"
    )]
    UnsupportedNullableType(String),

    /// Header options were not all set before they were needed.
    #[error("missing configuration: {}", join_keys(.0))]
    MissingConfiguration(Vec<ConfigKey>),

    /// An option was given with no value.
    #[error("{0} has no value")]
    MissingValue(String),

    /// A header option was set twice.
    #[error("{0} is set more than once")]
    DuplicateOption(ConfigKey),

    /// A column option is unknown or not allowed on the column's type.
    #[error("column '{column}': [{option}] {reason}")]
    UnsupportedOption {
        /// Column name as written.
        column: String,
        /// Option text between the brackets.
        option: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `[primary]` on a column that is not an integer.
    #[error("column '{column}' has type '{ty}'; only integer columns can be [primary]")]
    InvalidPrimaryKeyType {
        /// Column name as written.
        column: String,
        /// Type token as written.
        ty: String,
    },

    /// A second `[primary]` column in one entity.
    #[error("entity '{entity}' already has primary key '{existing}', '{column}' cannot be [primary] too")]
    DuplicatePrimaryKey {
        /// Entity name.
        entity: String,
        /// Column already holding the key.
        existing: String,
        /// Column that tried to claim it.
        column: String,
    },

    /// An entity closed without a `[primary]` column.
    #[error("entity '{0}' needs one integer column marked [primary]")]
    MissingPrimaryKey(String),

    /// `[deleted]` appeared without `[deletedon]`, or the other way round.
    #[error(
        "entity '{0}' must mark both a bool column [deleted] and a time.Time column \
         [deletedon], or neither"
    )]
    SoftDeletePairing(String),

    /// An alter block line was neither a rename, `[copy cols]`, nor `[add struct]`.
    #[error("expected 'OldColumn [to] NewColumn' in [alter table] block, found '{0}'")]
    MissingRename(String),

    /// A `[to]` line lacking its old or new column.
    #[error("[to] needs a column name on both sides, found '{0}'")]
    IncompleteRename(String),

    /// Any other malformed line or block.
    #[error("{0}")]
    Structural(String),
}

impl ParseError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    pub(crate) fn invalid_name(context: &'static str) -> impl FnOnce(NameError) -> Self {
        move |source| Self::InvalidName { context, source }
    }
}

fn join_keys(keys: &[ConfigKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A [`ParseError`] tagged with the 1-based line it was raised on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {error}")]
pub struct LineError {
    /// Line number, or the line after the last one for end-of-input errors.
    pub line: usize,
    /// The error itself.
    #[source]
    pub error: ParseError,
}

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configuration_lists_keys() {
        let err = ParseError::MissingConfiguration(vec![ConfigKey::Ssl, ConfigKey::Package]);
        assert_eq!(err.to_string(), "missing configuration: [ssl], [package]");
    }

    #[test]
    fn test_line_error_display() {
        let err = LineError {
            line: 12,
            error: ParseError::MissingPrimaryKey("User".into()),
        };
        assert_eq!(
            err.to_string(),
            "line 12: entity 'User' needs one integer column marked [primary]"
        );
    }

    #[test]
    fn test_unsupported_type_suggests_ignore() {
        let err = ParseError::UnsupportedType("map[string]int".into());
        assert!(err.to_string().contains("[ignore]"));
    }
}
