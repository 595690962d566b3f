//! Archive content listing with per-entry digests
//!
//! An [`EntrySource`] walks the non-directory entries of one archive. Sources
//! that can reopen an entry's content within a single walk (zip) are hashed in
//! one pass; sequential sources (7z) are walked once per requested algorithm
//! and the passes are merged by entry name, keeping first-seen order.

use crate::archive::{sevenz::SevenZipEntries, zip::ZipEntries};
use crate::format::{resolve_format, ArchiveFormat};
use crate::hash::{DefaultHashEngine, FileHash, HashAlgorithm, HashEngine};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One non-directory entry and its digests, aligned with the requested algorithms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub hashes: Vec<FileHash>,
}

/// How many walks a source needs to hash several algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Entry content can be opened repeatedly within one walk
    SinglePass,
    /// Entry content can be opened once per walk
    MultiPass,
}

/// Access to the content of the entry currently being visited
pub trait EntryStream {
    /// Open a reader positioned at the start of the entry content
    fn open(&mut self) -> io::Result<Box<dyn Read + '_>>;
}

/// Callback invoked for every non-directory entry of a walk
pub type EntryVisitor<'v> = dyn FnMut(&str, &mut dyn EntryStream) -> io::Result<()> + 'v;

/// Walkable view over the entries of one archive
pub trait EntrySource {
    fn traversal(&self) -> Traversal;

    /// Walk every non-directory entry once, in archive order
    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> io::Result<()>;
}

/// Insertion-ordered accumulation of digests per entry name
#[derive(Default)]
struct Merged {
    order: Vec<String>,
    hashes: HashMap<String, Vec<FileHash>>,
}

impl Merged {
    fn touch(&mut self, name: &str) -> &mut Vec<FileHash> {
        if !self.hashes.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.hashes.entry(name.to_string()).or_default()
    }

    fn into_file_infos(mut self, expected: usize) -> Result<Vec<FileInfo>> {
        let mut result = Vec::with_capacity(self.order.len());
        for name in self.order {
            let hashes = self.hashes.remove(&name).unwrap_or_default();
            if hashes.len() != expected {
                return Err(Error::InconsistentEntries {
                    name,
                    expected,
                    found: hashes.len(),
                });
            }
            result.push(FileInfo { name, hashes });
        }
        Ok(result)
    }
}

/// Names visited during one walk of a source
#[derive(Default)]
struct Walk {
    seen: HashSet<String>,
    duplicate: Option<String>,
}

impl Walk {
    /// Record `name`, failing the walk when it was already visited
    fn enter(&mut self, name: &str) -> io::Result<()> {
        if self.seen.insert(name.to_string()) {
            return Ok(());
        }
        self.duplicate = Some(name.to_string());
        Err(io::Error::other(format!("entry {} visited twice", name)))
    }

    fn finish(self, outcome: io::Result<()>, archive: &Path) -> Result<()> {
        match (outcome, self.duplicate) {
            (Ok(()), _) => Ok(()),
            (Err(_), Some(name)) => Err(Error::DuplicateEntry {
                archive: archive.display().to_string(),
                name,
            }),
            (Err(e), None) => Err(Error::ArchiveReadFailure {
                archive: archive.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Enumerate `source` and compute one digest per entry per algorithm.
///
/// With no algorithms the engine is never called and every entry is returned
/// with an empty hash list. Any read failure aborts the whole call; no partial
/// result is returned. An entry name occurring twice in one walk is fatal.
pub fn aggregate(
    source: &mut dyn EntrySource,
    algorithms: &[HashAlgorithm],
    engine: &dyn HashEngine,
    archive: &Path,
) -> Result<Vec<FileInfo>> {
    let mut merged = Merged::default();

    if algorithms.is_empty() {
        let mut walk = Walk::default();
        let outcome = source.visit(&mut |name, _| {
            walk.enter(name)?;
            merged.touch(name);
            Ok(())
        });
        walk.finish(outcome, archive)?;
        return merged.into_file_infos(0);
    }

    match source.traversal() {
        Traversal::SinglePass => {
            debug!("Hashing {:?} in a single pass", archive);
            let mut walk = Walk::default();
            let outcome = source.visit(&mut |name, stream| {
                walk.enter(name)?;
                let mut hashes = Vec::with_capacity(algorithms.len());
                for &algorithm in algorithms {
                    let mut reader = stream.open()?;
                    hashes.push(engine.compute(algorithm, &mut reader)?);
                }
                merged.touch(name).extend(hashes);
                Ok(())
            });
            walk.finish(outcome, archive)?;
        }
        Traversal::MultiPass => {
            for (pass, &algorithm) in algorithms.iter().enumerate() {
                debug!("Hashing {:?} pass {} ({})", archive, pass + 1, algorithm);
                let mut walk = Walk::default();
                let outcome = source.visit(&mut |name, stream| {
                    walk.enter(name)?;
                    let mut reader = stream.open()?;
                    let hash = engine.compute(algorithm, &mut reader)?;
                    let hashes = merged.touch(name);
                    // An entry first seen in a later pass stays short and is reported below
                    if hashes.len() == pass {
                        hashes.push(hash);
                    }
                    Ok(())
                });
                walk.finish(outcome, archive)?;
            }
        }
    }

    merged.into_file_infos(algorithms.len())
}

/// Lists the entries of an archive file along with their digests
pub struct FileInfoRetriever {
    path: PathBuf,
    engine: Box<dyn HashEngine>,
}

impl FileInfoRetriever {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_engine(path, DefaultHashEngine::new())
    }

    pub fn with_engine<P: AsRef<Path>, E: HashEngine + 'static>(path: P, engine: E) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            engine: Box::new(engine),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries of the archive with one digest per requested algorithm, in
    /// request order. Duplicated algorithms yield duplicated digests.
    pub fn get_file_info(&self, algorithms: &[HashAlgorithm]) -> Result<Vec<FileInfo>> {
        let format = resolve_format(&self.path)?;
        info!(
            "Reading entries of {:?} ({}) with {} algorithm(s)",
            self.path,
            format,
            algorithms.len()
        );

        let open_failure = |e: io::Error| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::ArchiveFileNotFound(self.path.display().to_string())
            } else {
                Error::ArchiveReadFailure {
                    archive: self.path.display().to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let result = match format {
            ArchiveFormat::Zip => {
                let mut source = ZipEntries::open(&self.path).map_err(open_failure)?;
                aggregate(&mut source, algorithms, self.engine.as_ref(), &self.path)
            }
            ArchiveFormat::SevenZip => {
                let mut source = SevenZipEntries::open(&self.path).map_err(open_failure)?;
                aggregate(&mut source, algorithms, self.engine.as_ref(), &self.path)
            }
        }?;

        info!("Found {} entries in {:?}", result.len(), self.path);
        Ok(result)
    }
}
