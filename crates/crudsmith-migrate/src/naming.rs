//! Free-name search for tables, constraints, sequences and indexes.

use std::fmt;
use std::future::Future;

use serde::Serialize;

/// Kind of database object that can be displaced by a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// A table, looked up in `information_schema.tables`.
    Table,
    /// An index or primary-key constraint, looked up in `pg_class`.
    Index,
    /// A sequence, looked up in `pg_class`.
    Sequence,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Index => "index",
            Self::Sequence => "sequence",
        })
    }
}

/// An existing object moved out of the way of a canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Displaced {
    /// What was renamed.
    pub kind: ObjectKind,
    /// The canonical name it held.
    pub from: String,
    /// The free name it now has.
    pub to: String,
}

/// Longest identifier Postgres keeps, in bytes. Longer names are
/// silently cut to this length when objects are created.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Cuts `name` to at most `max` bytes on a character boundary.
#[must_use]
pub fn truncate_identifier(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// The name Postgres stores for `name`.
#[must_use]
pub fn stored_identifier(name: &str) -> String {
    truncate_identifier(name, MAX_IDENTIFIER_LEN).to_string()
}

/// Returns the first of `canonical`, `canonical1`, `canonical2`, ... for
/// which `exists` answers `false`.
///
/// Every candidate fits in [`MAX_IDENTIFIER_LEN`] bytes: the canonical
/// name is cut short to leave room for the suffix.
///
/// # Errors
///
/// Returns the first error of `exists`.
pub async fn find_free_name<F, Fut, E>(canonical: &str, mut exists: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let mut candidate = stored_identifier(canonical);
    let mut suffix: u64 = 0;
    while exists(candidate.clone()).await? {
        suffix += 1;
        let digits = suffix.to_string();
        let stem = truncate_identifier(canonical, MAX_IDENTIFIER_LEN - digits.len());
        candidate = format!("{stem}{digits}");
    }
    Ok(candidate)
}
