//! Archive format detection
//!
//! The format of an archive is decided purely from the suffix of the archive
//! path: `.7z` or `.zip`, matched case-sensitively. Source file paths are
//! never inspected.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Supported archive container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// 7-Zip container
    SevenZip,
    /// ZIP container
    Zip,
}

/// Static description of a format
#[derive(Debug, Clone, Copy)]
pub struct FormatSpec {
    pub format: ArchiveFormat,
    /// Suffix the archive path must end with, dot included
    pub suffix: &'static str,
    pub name: &'static str,
}

/// Every supported format, in lookup order
pub const FORMATS: [FormatSpec; 2] = [
    FormatSpec {
        format: ArchiveFormat::SevenZip,
        suffix: ".7z",
        name: "7z",
    },
    FormatSpec {
        format: ArchiveFormat::Zip,
        suffix: ".zip",
        name: "zip",
    },
];

impl ArchiveFormat {
    /// Table row for this format
    pub fn spec(self) -> &'static FormatSpec {
        match self {
            ArchiveFormat::SevenZip => &FORMATS[0],
            ArchiveFormat::Zip => &FORMATS[1],
        }
    }

    pub fn suffix(self) -> &'static str {
        self.spec().suffix
    }

    /// Detect the format of an archive path
    pub fn from_path(path: &Path) -> Result<Self> {
        resolve_format(path)
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().name)
    }
}

/// Resolve the format implied by an archive path's suffix.
///
/// Fails with [`Error::UnsupportedFormat`] when no known suffix matches;
/// there is no fallback format.
pub fn resolve_format<P: AsRef<Path>>(path: P) -> Result<ArchiveFormat> {
    let path = path.as_ref();
    let name = path.to_string_lossy();

    FORMATS
        .iter()
        .find(|spec| name.ends_with(spec.suffix))
        .map(|spec| spec.format)
        .ok_or_else(|| Error::UnsupportedFormat(format!("{}", path.display())))
}
