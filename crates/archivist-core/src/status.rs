//! Backend status codes and their classification into [`Error`]s

use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::error;

/// Integer status returned by a codec backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode(0);
    pub const DESTINATION_EXISTS: StatusCode = StatusCode(1);
    pub const SOURCE_NOT_FOUND: StatusCode = StatusCode(2);
    /// Emitted by the built-in codecs; not in the classification table
    pub const ENTRY_NOT_FOUND: StatusCode = StatusCode(3);
    /// Emitted by the built-in codecs; not in the classification table
    pub const ENGINE_FAILURE: StatusCode = StatusCode(4);
    pub const ARCHIVE_NOT_FOUND: StatusCode = StatusCode(9);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The call a status code was produced by
#[derive(Debug, Clone)]
pub enum OperationContext {
    Pack {
        sources: Vec<PathBuf>,
        archive: PathBuf,
    },
    Unpack {
        archive: PathBuf,
        destination: PathBuf,
    },
    UnpackEntry {
        archive: PathBuf,
        entry: String,
        destination: PathBuf,
    },
}

impl OperationContext {
    pub fn pack(sources: &[PathBuf], archive: &Path) -> Self {
        OperationContext::Pack {
            sources: sources.to_vec(),
            archive: archive.to_path_buf(),
        }
    }

    pub fn unpack(archive: &Path, destination: &Path) -> Self {
        OperationContext::Unpack {
            archive: archive.to_path_buf(),
            destination: destination.to_path_buf(),
        }
    }

    pub fn unpack_entry(archive: &Path, entry: &str, destination: &Path) -> Self {
        OperationContext::UnpackEntry {
            archive: archive.to_path_buf(),
            entry: entry.to_string(),
            destination: destination.to_path_buf(),
        }
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationContext::Pack { sources, archive } if sources.len() == 1 => write!(
                f,
                "Archive single file: {} to {}",
                sources[0].display(),
                archive.display()
            ),
            OperationContext::Pack { sources, archive } => {
                write!(f, "Archive multiple file: [")?;
                for (i, source) in sources.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", source.display())?;
                }
                write!(f, "] to {}", archive.display())
            }
            OperationContext::Unpack {
                archive,
                destination,
            } => write!(
                f,
                "Unarchive: {} to {}",
                archive.display(),
                destination.display()
            ),
            OperationContext::UnpackEntry {
                archive,
                entry,
                destination,
            } => write!(
                f,
                "Unarchive: {} from {} to {}",
                entry,
                archive.display(),
                destination.display()
            ),
        }
    }
}

/// Map a status code to its domain error. `None` means success.
///
/// | code | error |
/// |---|---|
/// | 0 | none |
/// | 1 | [`Error::DestinationAlreadyExists`] |
/// | 2 | [`Error::SourceFileNotFound`] |
/// | 9 | [`Error::ArchiveFileNotFound`] |
/// | other | [`Error::UnknownBackendStatus`] |
pub fn classify(status: StatusCode, context: &OperationContext) -> Option<Error> {
    let context = context.to_string();
    match status.code() {
        0 => None,
        1 => Some(Error::DestinationAlreadyExists(context)),
        2 => Some(Error::SourceFileNotFound(context)),
        9 => Some(Error::ArchiveFileNotFound(context)),
        code => Some(Error::UnknownBackendStatus { code, context }),
    }
}

/// Turn a backend status into a `Result`, logging any failure before it is
/// returned.
pub fn check(status: StatusCode, context: &OperationContext) -> Result<()> {
    match classify(status, context) {
        None => Ok(()),
        Some(err) => {
            error!(status = status.code(), "{}", err);
            Err(err)
        }
    }
}
