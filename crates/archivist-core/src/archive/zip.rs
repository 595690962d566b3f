//! ZIP codec and entry source

use super::{
    check_archive, check_destination, collect_items, enclosed_path, into_status,
    prepare_archive_parent, write_entry, CodecBackend, CodecFailure, CodecOptions, CodecResult,
};
use crate::config::ZipCompression;
use crate::info::{EntrySource, EntryStream, EntryVisitor, Traversal};
use crate::status::StatusCode;
use crate::Result;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

impl From<ZipError> for CodecFailure {
    fn from(err: ZipError) -> Self {
        CodecFailure::new(StatusCode::ENGINE_FAILURE, err)
    }
}

/// ZIP codec backed by the `zip` crate
#[derive(Debug, Clone, Default)]
pub struct ZipCodec {
    options: CodecOptions,
}

impl ZipCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    fn method(&self) -> CompressionMethod {
        match self.options.zip_compression {
            ZipCompression::Deflated => CompressionMethod::Deflated,
            ZipCompression::Stored => CompressionMethod::Stored,
        }
    }

    fn write_archive(&self, sources: &[PathBuf], archive: &Path) -> CodecResult {
        let items = collect_items(sources)?;
        check_destination(archive, self.options.overwrite)?;
        prepare_archive_parent(archive)?;

        let mut zip = ZipWriter::new(File::create(archive)?);
        for item in items {
            if item.is_dir {
                debug!("Adding directory to ZIP: {}/", item.name);
                let options =
                    SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
                zip.add_directory(format!("{}/", item.name), options)?;
                continue;
            }

            debug!("Adding file to ZIP: {:?} as {}", item.path, item.name);
            let mut file = File::open(&item.path)?;
            let options = SimpleFileOptions::default()
                .compression_method(self.method())
                .compression_level(self.options.zip_level);

            #[cfg(unix)]
            let options = {
                use std::os::unix::fs::PermissionsExt;
                options.unix_permissions(file.metadata()?.permissions().mode())
            };

            zip.start_file(item.name.clone(), options)?;
            io::copy(&mut file, &mut zip)?;
        }
        zip.finish()?;

        info!("Successfully packed ZIP archive: {:?}", archive);
        Ok(())
    }

    fn extract_all(&self, archive: &Path, destination: &Path) -> CodecResult {
        check_archive(archive)?;
        fs::create_dir_all(destination)?;

        let mut zip = ZipArchive::new(File::open(archive)?)?;
        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            let Some(relative) = file.enclosed_name() else {
                warn!("Skipping entry outside destination: {}", file.name());
                continue;
            };
            let path = destination.join(&relative);

            if file.is_dir() {
                fs::create_dir_all(&path)?;
                continue;
            }
            debug!("Extracting: {:?}", relative);
            write_entry(&mut file, &path, self.options.overwrite)?;
        }

        info!("Successfully extracted ZIP archive: {:?}", archive);
        Ok(())
    }

    fn extract_one(&self, archive: &Path, entry: &str, destination: &Path) -> CodecResult {
        check_archive(archive)?;

        let mut zip = ZipArchive::new(File::open(archive)?)?;
        let mut file = match zip.by_name(entry) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(CodecFailure::new(
                    StatusCode::ENTRY_NOT_FOUND,
                    format!("{} not found in {}", entry, archive.display()),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        let path = enclosed_path(destination, file.name()).ok_or_else(|| {
            CodecFailure::new(
                StatusCode::ENGINE_FAILURE,
                format!("{} escapes {}", entry, destination.display()),
            )
        })?;
        fs::create_dir_all(destination)?;

        if file.is_dir() {
            fs::create_dir_all(&path)?;
        } else {
            write_entry(&mut file, &path, self.options.overwrite)?;
        }
        Ok(())
    }
}

impl CodecBackend for ZipCodec {
    fn name(&self) -> &'static str {
        "zip"
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

/// Random-access view over the entries of a ZIP file
pub struct ZipEntries {
    archive: ZipArchive<File>,
}

impl ZipEntries {
    pub fn open(path: &Path) -> io::Result<Self> {
        let archive = ZipArchive::new(File::open(path)?).map_err(io::Error::other)?;
        Ok(Self { archive })
    }
}

struct ZipEntryStream<'a> {
    archive: &'a mut ZipArchive<File>,
    index: usize,
}

impl EntryStream for ZipEntryStream<'_> {
    fn open(&mut self) -> io::Result<Box<dyn Read + '_>> {
        let file = self
            .archive
            .by_index(self.index)
            .map_err(io::Error::other)?;
        Ok(Box::new(file))
    }
}

impl EntrySource for ZipEntries {
    fn traversal(&self) -> Traversal {
        Traversal::SinglePass
    }

    fn visit(&mut self, visitor: &mut EntryVisitor<'_>) -> io::Result<()> {
        for index in 0..self.archive.len() {
            let (name, is_dir) = {
                let file = self.archive.by_index(index).map_err(io::Error::other)?;
                (file.name().to_string(), file.is_dir())
            };
            if is_dir {
                continue;
            }

            let mut stream = ZipEntryStream {
                archive: &mut self.archive,
                index,
            };
            visitor(&name, &mut stream)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pack_refuses_existing_archive() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.txt");
        let archive = temp_dir.path().join("a.zip");
        fs::write(&source, "a").unwrap();
        fs::write(&archive, "occupied").unwrap();

        let codec = ZipCodec::default();
        assert_eq!(
            codec.pack(&[source.clone()], &archive).unwrap(),
            StatusCode::DESTINATION_EXISTS
        );

        let overwriting = ZipCodec::new(CodecOptions {
            overwrite: true,
            ..Default::default()
        });
        assert_eq!(
            overwriting.pack(&[source], &archive).unwrap(),
            StatusCode::SUCCESS
        );
    }

    #[test]
    fn test_status_codes() {
        let temp_dir = TempDir::new().unwrap();
        let codec = ZipCodec::default();
        let missing = temp_dir.path().join("missing.zip");

        assert_eq!(
            codec
                .pack(&[temp_dir.path().join("nope.txt")], &missing)
                .unwrap(),
            StatusCode::SOURCE_NOT_FOUND
        );
        assert_eq!(
            codec.unpack(&missing, temp_dir.path()).unwrap(),
            StatusCode::ARCHIVE_NOT_FOUND
        );
        assert_eq!(
            codec.unpack_entry(&missing, "x", temp_dir.path()).unwrap(),
            StatusCode::ARCHIVE_NOT_FOUND
        );
    }

    #[test]
    fn test_unpack_missing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("present.txt");
        let archive = temp_dir.path().join("one.zip");
        fs::write(&source, "here").unwrap();

        let codec = ZipCodec::default();
        codec.pack(&[source], &archive).unwrap();
        assert_eq!(
            codec
                .unpack_entry(&archive, "absent.txt", &temp_dir.path().join("out"))
                .unwrap(),
            StatusCode::ENTRY_NOT_FOUND
        );
    }

    #[test]
    fn test_stored_compression() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("plain.txt");
        let archive = temp_dir.path().join("plain.zip");
        fs::write(&source, "stored ".repeat(100)).unwrap();

        let codec = ZipCodec::new(CodecOptions {
            zip_compression: ZipCompression::Stored,
            ..Default::default()
        });
        assert_eq!(codec.pack(&[source], &archive).unwrap(), StatusCode::SUCCESS);

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let file = zip.by_index(0).unwrap();
        assert_eq!(file.compression(), CompressionMethod::Stored);
        assert_eq!(file.size(), 700);
    }
}
