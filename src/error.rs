//! Error types for bookmirror operations.

use thiserror::Error;

/// Errors that can occur while mirroring a book.
///
/// Most failures in the pipeline are recovered locally (a page, image,
/// or stylesheet that fails is logged and skipped); errors of this type
/// only propagate when the unit of work as a whole cannot proceed.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("missing required element: {0}")]
    MissingElement(String),
}

pub type Result<T> = std::result::Result<T, Error>;
