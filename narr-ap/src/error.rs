//! Error types for narr-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! Three kinds matter to navigation:
//! - `OutOfRange`: a caller asked for a chunk that does not exist. Never clamped.
//! - `Fetch`: catalog, metadata or audio retrieval failed. Recoverable.
//! - `PlaybackFailure`: the output rejected or could not decode the audio. Recoverable.

use thiserror::Error;

/// Main error type for narr-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Navigation targeted a chunk index outside the selected article
    #[error("Chunk index {index} out of range (article has {len} chunks)")]
    OutOfRange { index: usize, len: usize },

    /// Chunk navigation requested while no article is selected
    #[error("No article selected")]
    NoArticleSelected,

    /// Article with no chunks cannot be selected
    #[error("Article has no chunks: {0}")]
    EmptyArticle(String),

    /// A later-requested article selection has already been applied
    #[error("Selection of {0} was superseded by a newer selection")]
    SelectionSuperseded(String),

    /// Catalog, metadata or audio retrieval failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Audio output rejected or could not play the resource
    #[error("Playback failure: {0}")]
    PlaybackFailure(String),

    /// Navigation controller task is no longer running
    #[error("Playback engine stopped")]
    EngineStopped,

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<narr_common::Error> for Error {
    fn from(err: narr_common::Error) -> Self {
        match err {
            narr_common::Error::Io(e) => Error::Io(e),
            other => Error::Config(other.to_string()),
        }
    }
}

/// Convenience Result type using narr-ap Error
pub type Result<T> = std::result::Result<T, Error>;
