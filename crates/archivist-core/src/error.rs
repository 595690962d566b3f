//! Error types for archivist-core

use thiserror::Error;

/// Core error types for the archivist library
#[derive(Error, Debug)]
pub enum Error {
    /// Archive extension is neither `.7z` nor `.zip`
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Backend refused to overwrite an existing destination
    #[error("Destination file already exists: {0}")]
    DestinationAlreadyExists(String),

    /// A source file handed to the backend does not exist
    #[error("File not found: {0}")]
    SourceFileNotFound(String),

    /// The archive to unpack does not exist
    #[error("Archive file does not exist: {0}")]
    ArchiveFileNotFound(String),

    /// Backend returned a status code outside the known table
    #[error("Unknown error code: {code} : {context}")]
    UnknownBackendStatus { code: i32, context: String },

    /// Reading an entry while enumerating or hashing failed
    #[error("Failed to read archive {archive}: {reason}")]
    ArchiveReadFailure { archive: String, reason: String },

    /// No codec engine could be reached for the format
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Pack called without any source
    #[error("No source files given for {0}")]
    EmptySourceSet(String),

    /// Traversal passes disagreed on the entries of an archive
    #[error("Entry {name} has {found} digests, expected {expected}")]
    InconsistentEntries {
        name: String,
        expected: usize,
        found: usize,
    },

    /// The same entry name occurred twice in one walk of an archive
    #[error("Entry {name} occurs more than once in {archive}")]
    DuplicateEntry { archive: String, name: String },

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
