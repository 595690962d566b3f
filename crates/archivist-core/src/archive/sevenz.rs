//! 7z codec and entry source

use super::{
    check_archive, check_destination, collect_items, enclosed_path, into_status,
    prepare_archive_parent, write_entry, CodecBackend, CodecFailure, CodecOptions, CodecResult,
};
use crate::info::{EntrySource, EntryStream, EntryVisitor, Traversal};
use crate::status::StatusCode;
use crate::Result;
use sevenz_rust::{Password, SevenZArchiveEntry, SevenZReader, SevenZWriter};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

impl From<sevenz_rust::Error> for CodecFailure {
    fn from(err: sevenz_rust::Error) -> Self {
        CodecFailure::new(StatusCode::ENGINE_FAILURE, err)
    }
}

fn to_io(err: sevenz_rust::Error) -> io::Error {
    io::Error::other(err.to_string())
}

/// Discard whatever is left of an entry's content
fn skip(content: &mut dyn Read) -> io::Result<()> {
    io::copy(content, &mut io::sink())?;
    Ok(())
}

/// 7z codec backed by the `sevenz-rust` crate
#[derive(Debug, Clone, Default)]
pub struct SevenZipCodec {
    options: CodecOptions,
}

impl SevenZipCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    fn write_archive(&self, sources: &[PathBuf], archive: &Path) -> CodecResult {
        let items = collect_items(sources)?;
        check_destination(archive, self.options.overwrite)?;
        prepare_archive_parent(archive)?;

        let mut writer = SevenZWriter::create(archive)?;
        for item in items {
            let entry = SevenZArchiveEntry::from_path(&item.path, item.name.clone());
            if item.is_dir {
                debug!("Adding directory to 7z: {}", item.name);
                writer.push_archive_entry::<File>(entry, None)?;
            } else {
                debug!("Adding file to 7z: {:?} as {}", item.path, item.name);
                writer.push_archive_entry(entry, Some(File::open(&item.path)?))?;
            }
        }
        writer.finish()?;

        info!("Successfully packed 7z archive: {:?}", archive);
        Ok(())
    }

    fn extract_all(&self, archive: &Path, destination: &Path) -> CodecResult {
        check_archive(archive)?;
        fs::create_dir_all(destination)?;

        let overwrite = self.options.overwrite;
        let mut failure = None;
        let mut reader = SevenZReader::open(archive, Password::empty())?;
        reader.for_each_entries(|entry, content| {
            let Some(path) = enclosed_path(destination, &entry.name) else {
                warn!("Skipping entry outside destination: {}", entry.name);
                skip(content)?;
                return Ok(true);
            };

            if entry.is_directory {
                fs::create_dir_all(&path)?;
                return Ok(true);
            }

            debug!("Extracting: {:?}", entry.name);
            match write_entry(content, &path, overwrite) {
                Ok(()) => Ok(true),
                Err(f) => {
                    failure = Some(f);
                    Ok(false)
                }
            }
        })?;

        if let Some(failure) = failure {
            return Err(failure);
        }
        info!("7z extraction complete: {:?}", archive);
        Ok(())
    }

    fn extract_one(&self, archive: &Path, name: &str, destination: &Path) -> CodecResult {
        check_archive(archive)?;

        let overwrite = self.options.overwrite;
        let mut outcome: Option<CodecResult> = None;
        let mut reader = SevenZReader::open(archive, Password::empty())?;
        reader.for_each_entries(|entry, content| {
            if entry.name != name {
                skip(content)?;
                return Ok(true);
            }

            let result = match enclosed_path(destination, &entry.name) {
                None => Err(CodecFailure::new(
                    StatusCode::ENGINE_FAILURE,
                    format!("{} escapes {}", name, destination.display()),
                )),
                Some(path) if entry.is_directory => fs::create_dir_all(&path).map_err(Into::into),
                Some(path) => write_entry(content, &path, overwrite),
            };
            outcome = Some(result);
            Ok(false)
        })?;

        outcome.unwrap_or_else(|| {
            Err(CodecFailure::new(
                StatusCode::ENTRY_NOT_FOUND,
                format!("{} not found in {}", name, archive.display()),
            ))
        })
    }
}

impl CodecBackend for SevenZipCodec {
    fn name(&self) -> &'static str {
        "7z"
    }

    fn pack(&self, sources: &[PathBuf], archive: &Path) -> Result<StatusCode> {
        Ok(into_status(self.name(), self.write_archive(sources, archive)))
    }

    fn unpack(&self, archive: &Path, destination: &Path) -> Result<StatusCode> {
        Ok(into_status(self.name(), self.extract_all(archive, destination)))
    }

    fn unpack_entry(&self, archive: &Path, entry: &str, destination: &Path) -> Result<StatusCode> {
        Ok(into_status(
            self.name(),
            self.extract_one(archive, entry, destination),
        ))
    }
}

/// Sequential view over the entries of a 7z file.
///
/// Entry content is decoded in archive order and can be read once per walk,
/// so every walk reopens the archive.
pub struct SevenZipEntries {
    path: PathBuf,
}

impl SevenZipEntries {
    pub fn open(path: &Path) -> io::Result<Self> {
        // Surface a missing or unreadable archive before the first walk
        File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

struct SequentialStream<'a> {
    content: Option<&'a mut dyn Read>,
}

impl EntryStream for SequentialStream<'_> {
    fn open(&mut self) -> io::Result<Box<dyn Read + '_>> {
        match self.content.take() {
            Some(content) => Ok(Box::new(content)),
            None => Err(io::Error::other("7z entry content can only be read once per pass")),
        }
    }
}

impl EntrySource for SevenZipEntries {
    fn traversal(&self) -> Traversal {
        Traversal::MultiPass
    }

    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> io::Result<()> {
        let mut reader = SevenZReader::open(&self.path, Password::empty()).map_err(to_io)?;
        let mut failure = None;

        reader
            .for_each_entries(|entry, content| {
                if entry.is_directory {
                    return Ok(true);
                }

                let mut stream = SequentialStream {
                    content: Some(content),
                };
                if let Err(e) = visitor(&entry.name, &mut stream) {
                    failure = Some(e);
                    return Ok(false);
                }
                if let Some(rest) = stream.content.take() {
                    skip(rest)?;
                }
                Ok(true)
            })
            .map_err(to_io)?;

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
