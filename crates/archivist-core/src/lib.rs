//! Archivist - packing, unpacking and content hashing for zip and 7z archives
//!
//! The archive suffix selects the codec, codec status codes are classified
//! into [`Error`]s, and per-entry digests are collected under any number of
//! hash algorithms.

pub mod archive;
pub mod config;
pub mod error;
pub mod format;
pub mod hash;
pub mod info;
pub mod status;

pub use error::{Error, Result};

// Re-export commonly used types
pub use archive::{Archiver, CodecBackend, CodecOptions, CodecTable};
pub use config::Config;
pub use format::{resolve_format, ArchiveFormat};
pub use hash::{DefaultHashEngine, FileHash, HashAlgorithm, HashEngine};
pub use info::{FileInfo, FileInfoRetriever};
pub use status::{OperationContext, StatusCode};
