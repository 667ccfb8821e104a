//! Error types for valuelist.
//!
//! Library crates use [`ValueListError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` and turns it into a non-zero exit.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for every pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum ValueListError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching the source page.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The server answered with a non-success status.
    ///
    /// Keeps the response body: maintenance and error pages are worth a
    /// snapshot too.
    #[error("fetch error: {url}: HTTP {status}")]
    FetchStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// The page never became ready within the wait window.
    ///
    /// Carries the last HTML body seen (if any) so the caller can keep a
    /// snapshot for diagnosis.
    #[error("timed out after {waited:?} waiting for {url} to become ready")]
    FetchTimeout {
        url: String,
        waited: Duration,
        snapshot: Option<String>,
    },

    /// HTML structure did not yield any usable tables or records.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Spreadsheet writer error.
    #[error("export error: {0}")]
    Export(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ValueListError>;

impl ValueListError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error from any displayable message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an export error from any displayable message.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The HTML body captured before a fetch failure, if any.
    pub fn snapshot(&self) -> Option<&str> {
        match self {
            Self::FetchTimeout { snapshot, .. } => snapshot.as_deref(),
            Self::FetchStatus { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}
