//! Indexer error types

use codag_core::Language;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("{0} parser is not available")]
    ParserUnavailable(Language),

    #[error("failed to parse {path} as {language}")]
    ParseFailure { path: String, language: Language },

    #[error("failed to load {language} grammar: {message}")]
    Grammar { language: Language, message: String },

    #[error("invalid {kind} query for {language}: {message}")]
    Query {
        language: Language,
        kind: &'static str,
        message: String,
    },

    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
