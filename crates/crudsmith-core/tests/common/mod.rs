#![allow(dead_code)]

use crudsmith_core::prelude::*;

/// A complete header using snake-case naming.
pub const HEADER: &str = "\
[server] localhost:5432
[user] app
[password] secret
[database] appdb
[schema] public
[ssl] false
[underscore] true
[package] models
";

/// Same as [`HEADER`] but with lower-case naming.
pub const LOWERCASE_HEADER: &str = "\
[server] localhost:5432
[user] app
[password] secret
[database] appdb
[schema] public
[ssl] false
[underscore] false
[package] models
";

pub fn parse_ok(input: &str) -> ParsedFile {
    parse_str(input).unwrap_or_else(|e| panic!("Failed to parse:\n{input}\nError: {e}"))
}

pub fn parse_err(input: &str) -> LineError {
    parse_str(input)
        .err()
        .unwrap_or_else(|| panic!("Expected parse error for:\n{input}"))
}

/// Parses `body` after the snake-case header and returns the error kind.
pub fn body_err(body: &str) -> ParseError {
    parse_err(&format!("{HEADER}{body}")).error
}

/// Parses `body` after the snake-case header.
pub fn entities(body: &str) -> Vec<EntityDescriptor> {
    parse_ok(&format!("{HEADER}{body}")).entities
}

/// Parses a single entity after the snake-case header.
pub fn entity(body: &str) -> EntityDescriptor {
    let mut all = entities(body);
    assert_eq!(all.len(), 1, "expected exactly one entity");
    all.remove(0)
}
