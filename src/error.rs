//! Error taxonomy for documentation runs

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a summarizer backend call
#[derive(Debug, Error)]
pub enum SummarizerError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The call did not finish within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The service answered but produced no text
    #[error("empty response")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the documentation engine
#[derive(Debug, Error)]
pub enum DocError {
    /// Invalid configuration or unusable cache location; fatal at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// A single source file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The summarizer failed for an entity
    #[error("summarizer failed for {entity}: {source}")]
    Summarizer {
        entity: String,
        #[source]
        source: SummarizerError,
    },

    /// A directory could not be summarized because some of its files failed
    #[error("{entity}: {failed} failed child entities")]
    ChildrenFailed { entity: String, failed: usize },

    /// Persisting the cache failed
    #[error("cannot write cache {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run finished with failed entities; nothing was written for them
    #[error("documentation incomplete: {} failed entities", .failed.len())]
    Incomplete { failed: Vec<String> },

    /// Writing the output document failed
    #[error("cannot write output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DocError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable code used in rendered results
    pub fn code(&self) -> &'static str {
        match self {
            DocError::Config(_) => "CONFIG",
            DocError::Io { .. } => "IO",
            DocError::Summarizer { .. } => "SUMMARIZER",
            DocError::ChildrenFailed { .. } => "CHILDREN_FAILED",
            DocError::CacheWrite { .. } => "CACHE_WRITE",
            DocError::Incomplete { .. } => "INCOMPLETE",
            DocError::Output { .. } => "OUTPUT",
        }
    }
}

pub type DocResult<T> = std::result::Result<T, DocError>;
