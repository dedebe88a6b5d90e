// src/error.rs

use std::fmt;

/// Crate-wide error type.
///
/// `ParseMiss` (spec §7) is deliberately absent: a leaf's `can_parse`
/// returning false is a silent, branch-local failure represented by an
/// empty iterator, not a value of this enum. Everything here is either a
/// fatal construction-time misuse, an iterator-terminating failure, or a
/// path-discarding failure callers may want to inspect (e.g. to see why
/// `parse_flow` found no segmentation).
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A leaf could not advance under any branch of the current path.
    InvalidParsingPath,

    /// A primitive type refused to encode a value (overflow, malformed
    /// input, or a length outside the type's declared bounds).
    EncodingError(String),

    /// At path completion, a relation's targets were never bound.
    UnresolvedRelation { relation: String },

    /// A recursive `Alt`'s depth counter exceeded `max_depth`.
    RecursionLimit { max_depth: u32 },

    /// Construction-time misuse of the variable-tree API (e.g. a `Repeat`
    /// with `lo > hi`, or a node with zero children).
    TypeError(String),

    /// Construction-time misuse unrelated to type mismatches (e.g. a fuzz
    /// interval outside the type's domain).
    ValueError(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParsingPath => write!(f, "no branch could advance the parsing path"),
            Self::EncodingError(msg) => write!(f, "encoding error: {}", msg),
            Self::UnresolvedRelation { relation } => {
                write!(f, "relation '{}' was never resolved", relation)
            }
            Self::RecursionLimit { max_depth } => {
                write!(f, "recursive Alt exceeded max_depth={}", max_depth)
            }
            Self::TypeError(msg) => write!(f, "construction-time type error: {}", msg),
            Self::ValueError(msg) => write!(f, "construction-time value error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

/// Raised internally by the fuzzing overlay when a counter is exhausted.
/// Per spec §7 this is not an error surfaced to callers: the specializer's
/// iterator simply ends. Kept as its own type, rather than an
/// `EngineError` variant, so it cannot accidentally be propagated with `?`
/// past the point where it should terminate an iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxFuzzing;

impl fmt::Display for MaxFuzzing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fuzz counter exhausted")
    }
}
