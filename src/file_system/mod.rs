//! File systems a [`FileSystemResource`](crate::FileSystemResource) resolves its path against.
use std::fmt::Debug;
use std::io::{Read, Result as IoResult, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use url::Url;

use crate::errors::ResourceResult;

mod native;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use self::native::NativeFileSystem;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteFileSystem;

/// A readable and seekable stream opened by a file system.
pub trait SeekRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekRead for T {}

/// A writable and seekable stream opened by a file system.
pub trait SeekWrite: Write + Seek + Send {}

impl<T: Write + Seek + Send> SeekWrite for T {}

/// How a file is opened for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the file if missing and discard any previous content.
    Truncate,
    /// Write into an existing file from its start, keeping content not overwritten.
    Existing,
}

/// Metadata of an entry as reported by a file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Size of the content in bytes.
    pub len: u64,
    /// Time of the last modification, if the file system tracks it.
    pub modified: Option<SystemTime>,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// A hierarchy of files addressed by paths.
///
/// Every query resolves against the live state: nothing is cached between two calls.
pub trait FileSystem: Debug + Send + Sync {
    /// Checks whether paths of this file system are paths of the host.
    fn is_native(&self) -> bool {
        false
    }

    /// Turns an already cleaned path string into the path used for I/O.
    fn normalize(&self, path: &str) -> PathBuf {
        PathBuf::from(path)
    }

    /// Resolves a path to its absolute form without touching the file system.
    fn absolute(&self, path: &Path) -> PathBuf;

    /// The URL identifying the entry at `path`.
    fn to_url(&self, path: &Path) -> ResourceResult<Url>;

    /// Queries the metadata of the entry at `path`.
    fn metadata(&self, path: &Path) -> IoResult<Metadata>;

    /// Checks whether an entry exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }

    /// Checks whether the entry at `path` may be opened for reading.
    fn is_readable(&self, path: &Path) -> bool;

    /// Checks whether the entry at `path` may be opened for writing.
    fn is_writable(&self, path: &Path) -> bool;

    /// Opens the file at `path` for reading.
    fn open_read(&self, path: &Path) -> IoResult<Box<dyn SeekRead>>;

    /// Opens the file at `path` for writing.
    fn open_write(&self, path: &Path, mode: OpenMode) -> IoResult<Box<dyn SeekWrite>>;
}
