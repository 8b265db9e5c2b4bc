//! Line-local scanning of `[...]` tokens and column lines.

use crate::error::{ParseError, Result};

/// The first `[token]` on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Bracket<'a> {
    /// Lower-cased text between the brackets.
    pub content: String,
    /// Everything after the closing bracket.
    pub rest: &'a str,
}

/// Collects the first bracket token on `line` character by character.
///
/// Returns `None` when the line has no complete `[...]` token.
pub(crate) fn first_bracket(line: &str) -> Option<Bracket<'_>> {
    let mut open = None;
    for (i, c) in line.char_indices() {
        match (c, open) {
            ('[', None) => open = Some(i + 1),
            (']', Some(start)) => {
                return Some(Bracket {
                    content: line[start..i].to_lowercase(),
                    rest: &line[i + 1..],
                });
            }
            _ => {}
        }
    }
    None
}

/// A column line split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ColumnLine {
    /// Whitespace-separated words outside brackets and backticks.
    pub words: Vec<String>,
    /// Lower-cased, trimmed option texts in line order.
    pub options: Vec<String>,
    /// The backtick segment, verbatim.
    pub metadata: Option<String>,
}

/// Splits a column line into words, bracket options and backtick metadata.
///
/// An empty `[]` pair is part of a type token (`[]byte`), not an option.
pub(crate) fn split_column_line(line: &str) -> Result<ColumnLine> {
    let (body, metadata) = match line.split_once('`') {
        Some((head, tail)) => match tail.split_once('`') {
            Some((meta, after)) => (format!("{head} {after}"), Some(meta.to_string())),
            None => (head.to_string(), Some(tail.to_string())),
        },
        None => (line.to_string(), None),
    };

    let mut bare = String::with_capacity(body.len());
    let mut options = Vec::new();
    let mut open = None;
    for (i, c) in body.char_indices() {
        match open {
            None if c == '[' && !body[i + 1..].starts_with(']') => open = Some(i + 1),
            None => bare.push(c),
            Some(start) if c == ']' => {
                options.push(body[start..i].trim().to_lowercase());
                bare.push(' ');
                open = None;
            }
            Some(_) => {}
        }
    }
    if open.is_some() {
        return Err(ParseError::structural(format!(
            "unterminated '[' in column line '{}'",
            line.trim()
        )));
    }

    Ok(ColumnLine {
        words: bare.split_whitespace().map(str::to_string).collect(),
        options,
        metadata,
    })
}
