//! Placeholder scanning and single-pass substitution
//!
//! A placeholder is `%` + one or more word characters + `%`. Any other `%`
//! is literal text. Substitution walks the text once, left to right, and
//! never rescans what it inserted.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::defines::DefinitionTable;
use crate::error::{PreprocError, Result};

/// Placeholder pattern: %NAME%
pub static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%(\w+)%").expect("placeholder pattern is valid"));

/// Token representing a parsed template fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text (range in original string)
    Literal(Range<usize>),
    /// Placeholder reference: %name%
    Placeholder(&'a str),
}

/// Split text into literal runs and placeholders
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;

    for caps in PLACEHOLDER_PATTERN.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > literal_start {
            tokens.push(Token::Literal(literal_start..whole.start()));
        }
        tokens.push(Token::Placeholder(name.as_str()));
        literal_start = whole.end();
    }

    if literal_start < text.len() {
        tokens.push(Token::Literal(literal_start..text.len()));
    }

    tokens
}

/// Names referenced by placeholders, left to right (duplicates kept)
pub fn placeholders(text: &str) -> Vec<&str> {
    tokenize(text)
        .into_iter()
        .filter_map(|token| match token {
            Token::Placeholder(name) => Some(name),
            Token::Literal(_) => None,
        })
        .collect()
}

#[inline]
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(text)
}

/// Replace every placeholder with `lookup(name)`
///
/// The first lookup error aborts the pass.
pub fn substitute_placeholders<F>(text: &str, mut lookup: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut result = String::with_capacity(text.len());

    for token in tokenize(text) {
        match token {
            Token::Literal(range) => result.push_str(&text[range]),
            Token::Placeholder(name) => result.push_str(&lookup(name)?),
        }
    }

    Ok(result)
}

/// Final body pass: replace placeholders with already-resolved table values
pub fn substitute(text: &str, table: &DefinitionTable) -> Result<String> {
    substitute_placeholders(text, |name| {
        table
            .get(name)
            .map(str::to_string)
            .ok_or_else(|| PreprocError::UndefinedReference {
                name: name.to_string(),
                referenced_by: None,
            })
    })
}
