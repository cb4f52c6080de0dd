//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Cache misses are never errors: `check` and `get` report them as `None`.
/// This enum covers setup and persistence failures that callers must see
/// and must not paper over, such as an uncreatable cache directory or a
/// corrupt index file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache index could not be parsed as valid JSON.
    #[error("failed to parse cache index {path}: {reason}")]
    IndexParse {
        /// The index file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A serialization error occurred while writing the index.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
