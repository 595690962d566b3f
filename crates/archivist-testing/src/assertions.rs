//! Custom assertions for archivist tests

use anyhow::Result;
use sevenz_rust::{Password, SevenZReader};
use std::fs::File;
use std::path::Path;
use walkdir::WalkDir;

/// Relative paths of all regular files under `dir`, sorted, `/` separated
pub fn collect_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Assert that `dir` holds exactly the files in `expected`
pub fn assert_file_names(dir: &Path, expected: &[&str]) -> Result<()> {
    let actual = collect_file_names(dir)?;
    let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(actual, expected, "unexpected files under {:?}", dir);
    Ok(())
}

/// Assert that two files have identical contents
pub fn assert_files_equal(a: &Path, b: &Path) -> Result<()> {
    let left = std::fs::read(a)?;
    let right = std::fs::read(b)?;
    assert_eq!(left, right, "{:?} and {:?} differ", a, b);
    Ok(())
}

/// Entry names of a ZIP file in archive order, directories included
pub fn zip_entry_names(path: &Path) -> Result<Vec<String>> {
    let mut zip = zip::ZipArchive::new(File::open(path)?)?;
    let mut names = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        names.push(zip.by_index(index)?.name().to_string());
    }
    Ok(names)
}

/// Entry names of a 7z file in archive order, with a directory flag
pub fn sevenz_entries(path: &Path) -> Result<Vec<(String, bool)>> {
    let mut entries = Vec::new();
    let mut reader = SevenZReader::open(path, Password::empty())?;
    reader.for_each_entries(|entry, content| {
        entries.push((entry.name.clone(), entry.is_directory));
        std::io::copy(content, &mut std::io::sink())?;
        Ok(true)
    })?;
    Ok(entries)
}
