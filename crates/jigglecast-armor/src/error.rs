//! Armor override error types.

use std::path::PathBuf;

use thiserror::Error;

/// Armor cache result type
pub type ArmorResult<T> = Result<T, ArmorCacheError>;

/// Errors from loading or saving an override file.
#[derive(Debug, Error)]
pub enum ArmorCacheError {
    #[error("{path}: I/O error: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: invalid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Structural problems in an override document.
///
/// The first one found aborts the parse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("root is null")]
    NullRoot,

    #[error("root is not an object")]
    RootNotObject,

    #[error("group '{0}' is not an object")]
    GroupNotObject(String),

    #[error("{group}.{name}: expected array")]
    ExpectedArray { group: String, name: String },

    #[error("{group}.{name}: value array size must be 2, got {len}")]
    ArraySize {
        group: String,
        name: String,
        len: usize,
    },

    #[error("{group}.{name}: value type not numeric")]
    TypeNotNumeric { group: String, name: String },

    #[error("{group}.{name}: value not numeric")]
    ValueNotNumeric { group: String, name: String },

    #[error("{group}.{name}: value type {tag} out of range")]
    TypeOutOfRange {
        group: String,
        name: String,
        tag: serde_json::Number,
    },
}
