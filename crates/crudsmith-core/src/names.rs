//! Identifier utilities.
//!
//! Pure helpers used by the parser to validate and resolve table and
//! column names, and by the renderer to derive Rust item names.

use thiserror::Error;

/// An identifier that breaks the `[A-Za-z][A-Za-z0-9_]*` rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The name was left empty.
    #[error("the name was left empty")]
    Empty,

    /// The first character is not a letter.
    #[error("'{0}' must start with a letter")]
    LeadingNonLetter(String),

    /// A character other than a letter, digit or underscore was found.
    #[error("'{name}' contains '{found}', only letters, digits and underscores are allowed")]
    InvalidCharacter {
        /// The offending identifier.
        name: String,
        /// The first invalid character.
        found: char,
    },
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Checks that `name` is a valid table or column identifier.
///
/// # Errors
///
/// Returns a [`NameError`] when the name is empty, does not start with a
/// letter, or contains anything but letters, digits and underscores.
pub fn validate_identifier(name: &str) -> Result<(), NameError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(NameError::Empty);
    };
    if !first.is_ascii_alphabetic() {
        return Err(NameError::LeadingNonLetter(name.to_string()));
    }
    if let Some(found) = chars.find(|c| !is_ident_char(*c)) {
        return Err(NameError::InvalidCharacter {
            name: name.to_string(),
            found,
        });
    }
    Ok(())
}

/// Converts a camel-case identifier to snake case.
///
/// `CamelCaseID` becomes `camel_case_id` and `HTTPServer` becomes
/// `http_server`. An identifier that already contains an underscore is
/// only lower-cased: the scan stops at the first `_` and returns the
/// whole input in lower case.
///
/// # Errors
///
/// Returns a [`NameError`] if the first character is not a letter or a
/// character other than a letter or digit precedes the first underscore.
pub fn to_snake_case(identifier: &str) -> Result<String, NameError> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut snake = String::with_capacity(identifier.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            return Ok(identifier.to_lowercase());
        }
        if i == 0 {
            if !c.is_ascii_alphabetic() {
                return Err(NameError::LeadingNonLetter(identifier.to_string()));
            }
            snake.push(c.to_ascii_lowercase());
            continue;
        }
        if !c.is_ascii_alphanumeric() {
            return Err(NameError::InvalidCharacter {
                name: identifier.to_string(),
                found: c,
            });
        }
        if c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            if !prev.is_ascii_uppercase() || next_is_lower {
                snake.push('_');
            }
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
    }

    Ok(snake)
}

/// Collapses runs of spaces and tabs into a single space and trims both
/// ends.
#[must_use]
pub fn normalize_whitespace(line: &str) -> String {
    line.split(|c| c == ' ' || c == '\t')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-cases the first character, leaving the rest untouched.
#[must_use]
pub fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-cases the first character, leaving the rest untouched.
#[must_use]
pub fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Wraps the identifier in double quotes when it has any upper-case
/// letter, so Postgres does not fold it to lower case.
#[must_use]
pub fn quote_if_mixed_case(identifier: &str) -> String {
    if identifier.chars().any(char::is_uppercase) {
        format!("\"{identifier}\"")
    } else {
        identifier.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("loginID").is_ok());
        assert!(validate_identifier("a").is_ok());
        assert!(validate_identifier("tbl_user2").is_ok());

        assert_eq!(validate_identifier(""), Err(NameError::Empty));
        assert!(matches!(
            validate_identifier("2fast"),
            Err(NameError::LeadingNonLetter(_))
        ));
        assert!(matches!(
            validate_identifier("_hidden"),
            Err(NameError::LeadingNonLetter(_))
        ));
        assert_eq!(
            validate_identifier("user-name"),
            Err(NameError::InvalidCharacter {
                name: "user-name".into(),
                found: '-'
            })
        );
        assert!(validate_identifier("naïve").is_err());
    }

    #[test]
    fn test_snake_case_boundaries() {
        assert_eq!(to_snake_case("CamelCaseID").unwrap(), "camel_case_id");
        assert_eq!(to_snake_case("HTTPServer").unwrap(), "http_server");
        assert_eq!(to_snake_case("Simple").unwrap(), "simple");
        assert_eq!(to_snake_case("loginID").unwrap(), "login_id");
        assert_eq!(to_snake_case("userName").unwrap(), "user_name");
        assert_eq!(to_snake_case("ID").unwrap(), "id");
        assert_eq!(to_snake_case("page2Title").unwrap(), "page2_title");
        assert_eq!(to_snake_case("").unwrap(), "");
    }

    #[test]
    fn test_snake_case_underscore_short_circuit() {
        assert_eq!(to_snake_case("Already_Snake").unwrap(), "already_snake");
        assert_eq!(to_snake_case("myHTTP_Thing").unwrap(), "myhttp_thing");
        // Characters after the first underscore are not checked.
        assert_eq!(to_snake_case("a_b-c").unwrap(), "a_b-c");
    }

    #[test]
    fn test_snake_case_errors() {
        assert!(matches!(
            to_snake_case("1abc"),
            Err(NameError::LeadingNonLetter(_))
        ));
        assert!(matches!(
            to_snake_case("ab$c"),
            Err(NameError::InvalidCharacter { found: '$', .. })
        ));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Hello   world  "), "Hello world");
        assert_eq!(normalize_whitespace("\tid\t\tint  [primary]"), "id int [primary]");
        assert_eq!(normalize_whitespace("   "), "");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_case_transforms() {
        assert_eq!(upper_first("user"), "User");
        assert_eq!(upper_first("uSER"), "USER");
        assert_eq!(lower_first("LoginID"), "loginID");
        assert_eq!(upper_first(""), "");
        assert_eq!(lower_first(""), "");
    }

    #[test]
    fn test_quote_if_mixed_case() {
        assert_eq!(quote_if_mixed_case("appdb"), "appdb");
        assert_eq!(quote_if_mixed_case("AppDb"), "\"AppDb\"");
    }
}
