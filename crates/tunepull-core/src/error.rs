//! Error types for Tunepull core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Tunepull core operations.
///
/// Only two conditions are recovered by the pipeline: a video search that
/// finds nothing (not an error at all, the track is reported as skipped) and
/// a [`Error::Tag`] failure (logged, the track still finishes). Everything
/// else aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid run configuration (empty identifier, no usable output root).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The catalog could not resolve an input identifier.
    #[error("Failed to resolve {input}: {reason}")]
    Catalog {
        /// The URL or identifier that failed to resolve.
        input: String,
        /// Why resolution failed.
        reason: String,
    },

    /// Video search transport failure (distinct from finding no match).
    #[error("Video search failed for {query:?}: {reason}")]
    Search {
        /// The free-text query that was being searched.
        query: String,
        /// Why the search request failed.
        reason: String,
    },

    /// Audio download failed.
    #[error("Download failed for video {video_id}: {reason}")]
    Download {
        /// The video whose audio was being downloaded.
        video_id: String,
        /// Why the download failed.
        reason: String,
    },

    /// Tag writing failed. Recovered by the pipeline: logged, never fatal.
    #[error("Failed to write tags to {path}: {reason}")]
    Tag {
        /// The audio file that could not be tagged.
        path: PathBuf,
        /// Why tagging failed.
        reason: String,
    },

    /// File system operation failed.
    #[error("File system error at {path}: {message}")]
    FileSystem {
        /// Path where the error occurred.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
