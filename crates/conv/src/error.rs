use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the conversion pipeline.
///
/// None of these are recovered inside the library: they abort the current
/// reference root and surface to the binary.
#[derive(Debug, Error)]
pub enum ConvError {
    /// Owner cache file missing, unreadable or not a valid id -> name map
    #[error("failed to load owner cache from {path}: {reason}")]
    CacheLoad { path: PathBuf, reason: String },

    /// Owner cache could not be written
    #[error("failed to save owner cache to {path}: {reason}")]
    CacheSave { path: PathBuf, reason: String },

    /// Entry descriptor missing, unreadable or lacking a required field
    #[error("failed to parse entry descriptor {path}: {reason}")]
    EntryParse { path: PathBuf, reason: String },

    /// Remote metadata request failed or returned an unexpected body
    #[error("metadata request for aid {aid} failed: {reason}")]
    MetadataFetch { aid: i64, reason: String },

    #[error("unknown media type {0}")]
    UnknownMediaType(i64),

    #[error("failed to list {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("command queue closed before the command could be enqueued")]
    QueueClosed,

    /// Process replacement returned, so the program never started
    #[error("failed to exec {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConvResult<T> = Result<T, ConvError>;
