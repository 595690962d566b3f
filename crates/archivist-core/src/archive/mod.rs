//! Archive operations module
//!
//! [`Archiver`] resolves the format of the archive path, looks up the codec
//! registered for it in a [`CodecTable`] and turns the status code the codec
//! returns into a `Result`.

pub mod sevenz;
pub mod zip;

use crate::config::{Config, ZipCompression};
use crate::format::{resolve_format, ArchiveFormat};
use crate::status::{check, OperationContext, StatusCode};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Call contract of one codec engine.
///
/// Implementations report the outcome as a [`StatusCode`]; an `Err` means the
/// engine itself could not be reached.
pub trait CodecBackend: Send + Sync {
    /// Short engine name used in logs
    fn name(&self) -> &'static str;

    /// Pack `sources`, in order, into `archive`
    fn pack(&self, sources: &[PathBuf], archive: &Path) -> Result<StatusCode>;

    /// Pack a single file into `archive`
    fn pack_file(&self, source: &Path, archive: &Path) -> Result<StatusCode> {
        self.pack(&[source.to_path_buf()], archive)
    }

    /// Extract every entry of `archive` below `destination`
    fn unpack(&self, archive: &Path, destination: &Path) -> Result<StatusCode>;

    /// Extract the entry named `entry` below `destination`
    fn unpack_entry(&self, archive: &Path, entry: &str, destination: &Path) -> Result<StatusCode>;
}

/// Behaviour shared by the built-in codecs
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Replace existing archives and extracted files instead of reporting status 1
    pub overwrite: bool,
    pub zip_compression: ZipCompression,
    pub zip_level: Option<i64>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            zip_compression: ZipCompression::Deflated,
            zip_level: None,
        }
    }
}

impl From<&Config> for CodecOptions {
    fn from(config: &Config) -> Self {
        Self {
            overwrite: config.archive.overwrite,
            zip_compression: config.zip.compression,
            zip_level: config.zip.level,
        }
    }
}

/// Codec registered for each archive format
#[derive(Clone, Default)]
pub struct CodecTable {
    codecs: HashMap<ArchiveFormat, Arc<dyn CodecBackend>>,
}

static BUILTIN: OnceLock<Arc<CodecTable>> = OnceLock::new();

impl CodecTable {
    /// Table without any codec
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in zip and 7z codecs configured with `options`
    pub fn with_options(options: CodecOptions) -> Self {
        let mut table = Self::empty();
        table.register(
            ArchiveFormat::Zip,
            Arc::new(zip::ZipCodec::new(options.clone())),
        );
        table.register(
            ArchiveFormat::SevenZip,
            Arc::new(sevenz::SevenZipCodec::new(options)),
        );
        table
    }

    /// Process-wide table of built-in codecs with default options.
    ///
    /// Built on first use; later calls return the same table.
    pub fn builtin() -> Arc<CodecTable> {
        BUILTIN
            .get_or_init(|| {
                debug!("Initializing built-in codec table");
                Arc::new(Self::with_options(CodecOptions::default()))
            })
            .clone()
    }

    /// Register `codec` for `format`, replacing any previous one
    pub fn register(&mut self, format: ArchiveFormat, codec: Arc<dyn CodecBackend>) -> &mut Self {
        self.codecs.insert(format, codec);
        self
    }

    /// Codec for `format`
    pub fn get(&self, format: ArchiveFormat) -> Result<&dyn CodecBackend> {
        self.codecs
            .get(&format)
            .map(|codec| &**codec)
            .ok_or_else(|| Error::BackendUnavailable(format!("no {} codec registered", format)))
    }
}

impl fmt::Debug for CodecTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (format, codec) in &self.codecs {
            map.entry(format, &codec.name());
        }
        map.finish()
    }
}

/// Packs and unpacks archives, dispatching on the archive suffix
#[derive(Debug, Clone)]
pub struct Archiver {
    codecs: Arc<CodecTable>,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Archiver {
    /// Archiver using the shared built-in codecs
    pub fn new() -> Self {
        Self {
            codecs: CodecTable::builtin(),
        }
    }

    /// Archiver using built-in codecs configured from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::with_codecs(CodecTable::with_options(CodecOptions::from(config)))
    }

    pub fn with_codecs(codecs: CodecTable) -> Self {
        Self {
            codecs: Arc::new(codecs),
        }
    }

    pub fn codecs(&self) -> &CodecTable {
        &self.codecs
    }

    /// Pack one or more files into `archive`, whose suffix selects the format
    pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(&self, sources: &[P], archive: Q) -> Result<()> {
        let archive = archive.as_ref();
        let format = resolve_format(archive)?;
        if sources.is_empty() {
            return Err(Error::EmptySourceSet(archive.display().to_string()));
        }
        let codec = self.codecs.get(format)?;
        let sources: Vec<PathBuf> = sources.iter().map(|s| s.as_ref().to_path_buf()).collect();

        info!(
            "Packing {} file(s) into {:?} with {}",
            sources.len(),
            archive,
            codec.name()
        );
        let status = codec.pack(&sources, archive)?;
        check(status, &OperationContext::pack(&sources, archive))
    }

    /// Pack a single file into `archive`
    pub fn pack_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, source: P, archive: Q) -> Result<()> {
        let source = source.as_ref();
        let archive = archive.as_ref();
        let codec = self.codecs.get(resolve_format(archive)?)?;

        info!("Packing {:?} into {:?} with {}", source, archive, codec.name());
        let status = codec.pack_file(source, archive)?;
        check(
            status,
            &OperationContext::pack(&[source.to_path_buf()], archive),
        )
    }

    /// Extract every entry of `archive` into `destination`
    pub fn unpack<P: AsRef<Path>, Q: AsRef<Path>>(&self, archive: P, destination: Q) -> Result<()> {
        let archive = archive.as_ref();
        let destination = destination.as_ref();
        let codec = self.codecs.get(resolve_format(archive)?)?;

        info!("Unpacking {:?} to {:?} with {}", archive, destination, codec.name());
        let status = codec.unpack(archive, destination)?;
        check(status, &OperationContext::unpack(archive, destination))
    }

    /// Extract the single entry `entry` of `archive` into `destination`
    pub fn unpack_entry<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        archive: P,
        entry: &str,
        destination: Q,
    ) -> Result<()> {
        let archive = archive.as_ref();
        let destination = destination.as_ref();
        let codec = self.codecs.get(resolve_format(archive)?)?;

        info!(
            "Unpacking {} from {:?} to {:?} with {}",
            entry,
            archive,
            destination,
            codec.name()
        );
        let status = codec.unpack_entry(archive, entry, destination)?;
        check(
            status,
            &OperationContext::unpack_entry(archive, entry, destination),
        )
    }
}

/// Why a built-in codec call stopped, before it is reduced to a status code
#[derive(Debug)]
pub(crate) struct CodecFailure {
    status: StatusCode,
    cause: String,
}

impl CodecFailure {
    pub(crate) fn new(status: StatusCode, cause: impl fmt::Display) -> Self {
        Self {
            status,
            cause: cause.to_string(),
        }
    }
}

impl From<io::Error> for CodecFailure {
    fn from(err: io::Error) -> Self {
        Self::new(StatusCode::ENGINE_FAILURE, err)
    }
}

pub(crate) type CodecResult = std::result::Result<(), CodecFailure>;

/// Reduce a codec outcome to the status code handed back to the archiver
pub(crate) fn into_status(codec: &str, outcome: CodecResult) -> StatusCode {
    match outcome {
        Ok(()) => StatusCode::SUCCESS,
        Err(failure) => {
            warn!(
                codec,
                status = failure.status.code(),
                "{}",
                failure.cause
            );
            failure.status
        }
    }
}

/// One filesystem item to be written into an archive
#[derive(Debug, Clone)]
pub(crate) struct PackItem {
    pub path: PathBuf,
    /// Entry name, `/`-separated
    pub name: String,
    pub is_dir: bool,
}

/// Expand sources into archive items.
///
/// A file becomes one entry named after its base name. A directory becomes a
/// directory entry plus everything below it, named relative to the
/// directory's parent.
/// Two items resolving to the same entry name fail the whole pack before
/// anything is written.
pub(crate) fn collect_items(sources: &[PathBuf]) -> std::result::Result<Vec<PackItem>, CodecFailure> {
    let mut items: Vec<PackItem> = Vec::new();
    let mut names = HashSet::new();
    let mut push = |item: PackItem| {
        if !names.insert(item.name.clone()) {
            return Err(CodecFailure::new(
                StatusCode::ENGINE_FAILURE,
                format!("duplicate entry name {} from {}", item.name, item.path.display()),
            ));
        }
        items.push(item);
        Ok(())
    };

    for source in sources {
        let metadata = fs::metadata(source).map_err(|e| {
            CodecFailure::new(
                StatusCode::SOURCE_NOT_FOUND,
                format!("{}: {}", source.display(), e),
            )
        })?;
        let base = source.file_name().ok_or_else(|| {
            CodecFailure::new(
                StatusCode::SOURCE_NOT_FOUND,
                format!("{} has no file name", source.display()),
            )
        })?;

        if metadata.is_file() {
            push(PackItem {
                path: source.clone(),
                name: base.to_string_lossy().into_owned(),
                is_dir: false,
            })?;
            continue;
        }

        let parent = source.parent().unwrap_or(Path::new(""));
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|e| CodecFailure::new(StatusCode::ENGINE_FAILURE, e))?;
            let relative = entry
                .path()
                .strip_prefix(parent)
                .map_err(|e| CodecFailure::new(StatusCode::ENGINE_FAILURE, e))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let file_type = entry.file_type();
            if file_type.is_dir() || file_type.is_file() {
                push(PackItem {
                    path: entry.path().to_path_buf(),
                    name,
                    is_dir: file_type.is_dir(),
                })?;
            } else {
                warn!("Skipping non-regular file: {:?}", entry.path());
            }
        }
    }

    Ok(items)
}

/// Fail with status 1 when `path` exists and overwriting is disabled
pub(crate) fn check_destination(path: &Path, overwrite: bool) -> CodecResult {
    if path.exists() && !overwrite {
        return Err(CodecFailure::new(
            StatusCode::DESTINATION_EXISTS,
            format!("{} already exists", path.display()),
        ));
    }
    Ok(())
}

/// Fail with status 9 when the archive to read is missing
pub(crate) fn check_archive(path: &Path) -> CodecResult {
    if !path.is_file() {
        return Err(CodecFailure::new(
            StatusCode::ARCHIVE_NOT_FOUND,
            format!("{} does not exist", path.display()),
        ));
    }
    Ok(())
}

/// Create the parent directory of an archive about to be written
pub(crate) fn prepare_archive_parent(archive: &Path) -> CodecResult {
    if let Some(parent) = archive.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Copy one entry's content to `path`, creating parent directories
pub(crate) fn write_entry(reader: &mut dyn Read, path: &Path, overwrite: bool) -> CodecResult {
    check_destination(path, overwrite)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut output = File::create(path)?;
    io::copy(reader, &mut output)?;
    Ok(())
}

/// Join an entry name onto `base`, refusing names that would leave it
pub(crate) fn enclosed_path(base: &Path, name: &str) -> Option<PathBuf> {
    let mut result = base.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                result.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (depth > 0).then_some(result)
}
