// Dot-path and leaf parser
// The only textual syntax in a mapping spec lives in its string leaves and keys

use std::rc::Rc;

use crate::ast::{Leaf, Path, Segment};
use crate::options::DEFAULT_MAX_DEPTH;
use thiserror::Error;

/// Separator between path segments
pub const SEPARATOR: char = '.';

/// Segment that fans out over a list
pub const WILDCARD: &str = "*";

/// Leading character of a literal leaf; doubled to escape a real field name
pub const LITERAL_PREFIX: char = '#';

/// Suffix marking a record key as an array of records
pub const ARRAY_KEY_SUFFIX: &str = ".*";

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Empty path")]
    EmptyPath,

    #[error("Path fans out {found} levels deep, limit is {limit}")]
    TooDeep { found: usize, limit: usize },
}

/// Parse a dot-path into segments.
///
/// Every token is a field name except `*`, which swallows the rest of the
/// tokens into a nested path. `a.*.b.*.c` therefore nests two levels deep.
/// Any non-empty string with at most `DEFAULT_MAX_DEPTH` wildcards is
/// accepted; whether a `*` actually lands on a list is only known against a
/// document.
pub fn parse_path(path: &str) -> Result<Path, ParserError> {
    parse_path_within(path, DEFAULT_MAX_DEPTH)
}

/// Parse a dot-path holding at most `max_fan_out` wildcards.
///
/// The wildcards are counted before any segment is built, so an oversized
/// path never becomes a deeply nested `Path`.
pub fn parse_path_within(path: &str, max_fan_out: usize) -> Result<Path, ParserError> {
    if path.is_empty() {
        return Err(ParserError::EmptyPath);
    }
    let tokens: Vec<&str> = path.split(SEPARATOR).collect();
    let found = tokens.iter().filter(|token| **token == WILDCARD).count();
    if found > max_fan_out {
        return Err(ParserError::TooDeep {
            found,
            limit: max_fan_out,
        });
    }
    Ok(parse_tokens(&tokens))
}

fn parse_tokens(tokens: &[&str]) -> Path {
    let mut segments = Vec::with_capacity(tokens.len());
    for (index, token) in tokens.iter().enumerate() {
        if *token == WILDCARD {
            segments.push(Segment::FanOut(parse_tokens(&tokens[index + 1..])));
            break;
        }
        segments.push(Segment::Field((*token).to_string()));
    }
    Path::new(segments)
}

/// Classify a string leaf as a literal or a lookup.
///
/// - `#text` is the constant `text`
/// - `##name` looks up the field `#name`
/// - anything else is a dot-path
pub fn parse_leaf(leaf: &str) -> Result<Leaf, ParserError> {
    parse_leaf_within(leaf, DEFAULT_MAX_DEPTH)
}

/// `parse_leaf` with a bound on the wildcards of a lookup path.
pub fn parse_leaf_within(leaf: &str, max_fan_out: usize) -> Result<Leaf, ParserError> {
    let path = match leaf.strip_prefix(LITERAL_PREFIX) {
        Some(rest) if !rest.starts_with(LITERAL_PREFIX) => {
            return Ok(Leaf::Literal(rest.into()));
        }
        Some(rest) => rest,
        None => leaf,
    };
    Ok(Leaf::Lookup(Rc::new(parse_path_within(path, max_fan_out)?)))
}

/// Split the array-of-records suffix off a record key.
///
/// Returns the output key and whether the suffix was present.
pub fn split_array_key(key: &str) -> (&str, bool) {
    match key.strip_suffix(ARRAY_KEY_SUFFIX) {
        Some(stripped) => (stripped, true),
        None => (key, false),
    }
}
