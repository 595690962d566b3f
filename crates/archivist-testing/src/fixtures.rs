//! Test fixtures for archivist

use anyhow::{bail, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use sevenz_rust::{SevenZArchiveEntry, SevenZWriter};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::TestDir;

/// CRC32 of the `jpeg.jpg` regression payload
pub const JPEG_CRC32: u32 = 0xFCA8_3AAE;

/// The same checksum in the signed little-endian form callers compare against
pub const JPEG_CRC32_SIGNED: [i8; 8] = [-82, 58, -88, -4, 0, 0, 0, 0];

/// Entry of a hand-built ZIP fixture
pub enum ZipFixtureEntry<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

/// Create a handful of small files in the test directory
pub fn create_sample_files(test_dir: &TestDir) -> Result<Vec<PathBuf>> {
    Ok(vec![
        test_dir.create_file("alpha.txt", b"alpha content")?,
        test_dir.create_file("beta.txt", b"beta content, a little longer")?,
        test_dir.create_file("gamma.bin", &[0u8, 1, 2, 3, 254, 255])?,
    ])
}

/// Create a directory tree with nested and empty directories
pub fn create_sample_tree(test_dir: &TestDir, root: &str) -> Result<PathBuf> {
    let root_path = test_dir.create_dir(root)?;
    test_dir.create_file(&format!("{}/readme.md", root), b"# tree")?;
    test_dir.create_file(&format!("{}/docs/guide.txt", root), b"guide text")?;
    test_dir.create_file(&format!("{}/docs/img/pixel.raw", root), &[7u8; 64])?;
    test_dir.create_dir(&format!("{}/empty", root))?;
    Ok(root_path)
}

/// Write a ZIP file with exactly the given entries, directories included
pub fn write_zip(path: &Path, entries: &[ZipFixtureEntry<'_>]) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(path)?);

    for entry in entries {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        match entry {
            ZipFixtureEntry::Dir(name) => zip.add_directory(*name, options)?,
            ZipFixtureEntry::File(name, data) => {
                zip.start_file(*name, options)?;
                zip.write_all(data)?;
            }
        }
    }
    zip.finish()?;
    Ok(())
}

/// Write a 7z file storing each `(entry name, file on disk)` pair verbatim.
///
/// Names are not checked, so the same name can be stored more than once.
pub fn write_7z(path: &Path, entries: &[(&str, &Path)]) -> Result<()> {
    let mut writer = SevenZWriter::create(path)?;
    for &(name, source) in entries {
        let entry = SevenZArchiveEntry::from_path(source, name.to_string());
        writer.push_archive_entry(entry, Some(File::open(source)?))?;
    }
    writer.finish()?;
    Ok(())
}

/// Reflected CRC32 lookup table.
///
/// Forging needs to search the table rows, which `crc32fast` keeps private.
fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (n, slot) in table.iter_mut().enumerate() {
        let mut c = n as u32;
        for _ in 0..8 {
            c = if c & 1 != 0 {
                0xEDB8_8320 ^ (c >> 1)
            } else {
                c >> 1
            };
        }
        *slot = c;
    }
    table
}

/// Append four bytes to `prefix` so the result has the CRC32 `target`
pub fn forge_crc32(prefix: &[u8], target: u32) -> Result<Vec<u8>> {
    let table = crc32_table();

    // Table rows for the appended bytes, last byte first
    let mut rows = [0usize; 4];
    let mut state = target ^ 0xFFFF_FFFF;
    for k in (0..4).rev() {
        let Some(row) = table.iter().position(|&t| t >> 24 == state >> 24) else {
            bail!("no CRC32 table row with top byte {:#04x}", state >> 24);
        };
        rows[k] = row;
        state = (state ^ table[row]) << 8;
    }

    let mut register = crc32fast::hash(prefix) ^ 0xFFFF_FFFF;
    let mut data = prefix.to_vec();
    for &row in &rows {
        data.push((register as u8) ^ row as u8);
        register = (register >> 8) ^ table[row];
    }

    let actual = crc32fast::hash(&data);
    if actual != target {
        bail!("forged CRC32 {:#010x}, wanted {:#010x}", actual, target);
    }
    Ok(data)
}

/// Bytes of the `jpeg.jpg` regression image, CRC32 [`JPEG_CRC32`]
pub fn jpeg_payload() -> Result<Vec<u8>> {
    let mut prefix = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    prefix.extend_from_slice(b"JFIF\0");
    prefix.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x48, 0x00, 0x48, 0x00, 0x00]);
    prefix.extend((0u8..=255).map(|b| b.wrapping_mul(31)));
    forge_crc32(&prefix, JPEG_CRC32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forge_crc32() {
        for target in [0u32, 0xFFFF_FFFF, 0xCBF4_3926, 0x1234_5678] {
            let data = forge_crc32(b"prefix", target).unwrap();
            assert_eq!(data.len(), 10);
            assert_eq!(crc32fast::hash(&data), target);
        }
    }

    #[test]
    fn test_jpeg_payload() {
        let data = jpeg_payload().unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        assert_eq!(crc32fast::hash(&data), JPEG_CRC32);
    }

    #[test]
    fn test_signed_form() {
        let signed: Vec<i8> = (JPEG_CRC32 as u64)
            .to_le_bytes()
            .iter()
            .map(|&b| b as i8)
            .collect();
        assert_eq!(signed, JPEG_CRC32_SIGNED);
    }

    #[test]
    fn test_write_zip_with_directories() {
        let test_dir = TestDir::new().unwrap();
        let path = test_dir.join("fixture.zip");
        write_zip(
            &path,
            &[
                ZipFixtureEntry::Dir("photos/"),
                ZipFixtureEntry::File("photos/a.txt", b"a"),
            ],
        )
        .unwrap();

        let zip = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
    }
}
