//! Temporary cache directories for token-store tests
//!
//! Wraps [`tempfile::TempDir`] with helpers for planting and inspecting the
//! files a token cache leaves behind.

// Allow missing error/panic docs for temp file utilities - IO errors are self-explanatory
#![allow(clippy::missing_errors_doc)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Cache directory that is removed when dropped
///
/// # Examples
///
/// ```
/// use deskauth_common::testing::temp::TempCacheDir;
///
/// let dir = TempCacheDir::new().unwrap();
/// dir.write_file("token_cache.dat", b"not base64").unwrap();
/// assert!(dir.contains("token_cache.dat"));
/// ```
#[derive(Debug)]
pub struct TempCacheDir {
    inner: tempfile::TempDir,
}

impl TempCacheDir {
    /// Create a fresh, empty directory.
    ///
    /// # Errors
    /// Returns the I/O error if the directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let inner = tempfile::Builder::new().prefix("deskauth-cache-").tempdir()?;
        Ok(Self { inner })
    }

    /// Directory root.
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Path of `name` inside the directory; the file need not exist.
    pub fn file(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }

    /// Whether `name` exists in the directory.
    pub fn contains(&self, name: &str) -> bool {
        self.file(name).exists()
    }

    /// Write `contents` to `name`, returning its path.
    ///
    /// # Errors
    /// Returns the I/O error from the write.
    pub fn write_file(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let path = self.file(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Read `name` back.
    ///
    /// # Errors
    /// Returns the I/O error from the read.
    pub fn read_file(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.file(name))
    }

    /// Flip one byte in the middle of `name`, keeping its length.
    pub fn corrupt(&self, name: &str) -> io::Result<()> {
        let mut bytes = self.read_file(name)?;
        if bytes.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "file is empty"));
        }
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'A' { b'B' } else { b'A' };
        fs::write(self.file(name), bytes)
    }

    /// Names of the regular files currently in the directory, sorted.
    pub fn file_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.path())? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
