//! Shared test support for the archivist crates
//!
//! [`TestDir`] gives each test its own scratch directory; `fixtures` builds
//! the files and archives tests pack, list and hash.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod assertions;
pub mod fixtures;
pub mod helpers;

pub use helpers::init_test_logging;

/// Scratch directory removed when dropped
pub struct TestDir {
    root: TempDir,
}

impl TestDir {
    pub fn new() -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix("archivist-")
            .tempdir()
            .context("creating scratch directory")?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// `name` resolved under the scratch directory. Nothing is created.
    pub fn join(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Write `content` to `name`, creating missing parent directories
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    pub fn create_dir(&self, name: &str) -> Result<PathBuf> {
        let path = self.join(name);
        fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
        Ok(path)
    }
}
