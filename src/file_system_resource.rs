use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::channel::{FileChannel, ReadableChannel, WritableChannel};
use crate::errors::{ResourceError, ResourceResult};
use crate::file_system::{FileSystem, NativeFileSystem, OpenMode, SeekRead, SeekWrite};
use crate::resource::{
    epoch_millis, Identity, InputStream, OutputStream, Resource, WritableResource,
};
use crate::util::{apply_relative_path, clean_path};

/// A resource backed by a path on a file system, the host's unless stated otherwise.
///
/// Every accessor asks the file system directly instead of probing streams. Two resources are
/// equal if their cleaned path strings are equal, regardless of how they were constructed.
#[derive(Debug, Clone)]
pub struct FileSystemResource {
    path: String,
    file_path: PathBuf,
    file_system: Arc<dyn FileSystem>,
}

impl FileSystemResource {
    /// Create a resource for a path string on the host file system.
    ///
    /// The string is cleaned for identity, while I/O uses it as given.
    pub fn new<T: AsRef<str>>(path: T) -> Self {
        let path = path.as_ref();
        FileSystemResource {
            path: clean_path(path),
            file_path: PathBuf::from(path),
            file_system: Arc::new(NativeFileSystem),
        }
    }

    /// Create a resource for a path on the host file system.
    pub fn from_path<T: AsRef<Path>>(path: T) -> Self {
        let file_path = path.as_ref().to_path_buf();
        FileSystemResource {
            path: clean_path(&file_path.to_string_lossy()),
            file_path,
            file_system: Arc::new(NativeFileSystem),
        }
    }

    /// Create a resource for a path string on a custom file system.
    pub fn with_file_system<T: AsRef<str>>(file_system: Arc<dyn FileSystem>, path: T) -> Self {
        let path = clean_path(path.as_ref());
        FileSystemResource {
            file_path: file_system.normalize(&path),
            path,
            file_system,
        }
    }

    /// The cleaned path string identifying this resource.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path I/O is performed on.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// The file system the path is resolved against.
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.file_system
    }

    /// Resolves a path relative to this one on the same file system.
    pub fn relative(&self, relative_path: &str) -> FileSystemResource {
        let path_to_use = apply_relative_path(&self.path, relative_path);
        match self.file_system.is_native() {
            true => FileSystemResource::new(path_to_use),
            false => {
                FileSystemResource::with_file_system(Arc::clone(&self.file_system), path_to_use)
            }
        }
    }

    /// Opens a positionable channel for reading.
    pub fn read_channel(&self) -> ResourceResult<FileChannel<Box<dyn SeekRead>>> {
        self.file_system
            .open_read(&self.file_path)
            .map(FileChannel::reader)
            .map_err(|error| ResourceError::from_native(error, &self.file_path))
    }

    /// Opens a positionable channel writing into the existing file, without truncating it.
    pub fn write_channel(&self) -> ResourceResult<FileChannel<Box<dyn SeekWrite>>> {
        self.file_system
            .open_write(&self.file_path, OpenMode::Existing)
            .map(FileChannel::writer)
            .map_err(|error| ResourceError::from_native(error, &self.file_path))
    }

    fn absolute_path(&self) -> PathBuf {
        self.file_system.absolute(&self.file_path)
    }

    fn is_directory(&self) -> bool {
        self.file_system
            .metadata(&self.file_path)
            .map(|metadata| metadata.is_dir)
            .unwrap_or(false)
    }
}

impl Resource for FileSystemResource {
    fn description(&self) -> String {
        format!("file [{}]", self.absolute_path().display())
    }

    fn identity(&self) -> Identity {
        Identity::Path(self.path.clone())
    }

    fn input_stream(&self) -> ResourceResult<InputStream> {
        match self.file_system.open_read(&self.file_path) {
            Ok(stream) => Ok(Box::new(stream)),
            Err(error) => Err(ResourceError::from_native(error, &self.file_path)),
        }
    }

    fn exists(&self) -> bool {
        self.file_system.exists(&self.file_path)
    }

    fn is_readable(&self) -> bool {
        self.file_system.is_readable(&self.file_path) && !self.is_directory()
    }

    fn is_file(&self) -> bool {
        self.file_system.is_native()
    }

    fn url(&self) -> ResourceResult<Url> {
        self.file_system.to_url(&self.file_path)
    }

    fn uri(&self) -> ResourceResult<Url> {
        self.url()
    }

    fn file(&self) -> ResourceResult<PathBuf> {
        match self.file_system.is_native() {
            true => Ok(self.file_path.clone()),
            false => Err(ResourceError::NotFound(format!(
                "{} cannot be resolved to absolute file path",
                self.description()
            ))),
        }
    }

    fn readable_channel(&self) -> ResourceResult<Box<dyn ReadableChannel>> {
        Ok(Box::new(self.read_channel()?))
    }

    fn content_length(&self) -> ResourceResult<u64> {
        match self.file_system.metadata(&self.file_path) {
            Ok(metadata) => Ok(metadata.len),
            Err(error) => Err(match ResourceError::from_native(error, &self.file_path) {
                ResourceError::NotFound(_) => ResourceError::NotFound(format!(
                    "{} cannot be resolved in the file system for checking its content length",
                    self.description()
                )),
                other => other,
            }),
        }
    }

    fn last_modified(&self) -> ResourceResult<u64> {
        let missing = || {
            ResourceError::NotFound(format!(
                "{} cannot be resolved in the file system for checking its last-modified timestamp",
                self.description()
            ))
        };

        let metadata = self
            .file_system
            .metadata(&self.file_path)
            .map_err(|error| match ResourceError::from_native(error, &self.file_path) {
                ResourceError::NotFound(_) => missing(),
                other => other,
            })?;
        match metadata.modified.map(epoch_millis) {
            Some(last_modified) => Ok(last_modified),
            None => Err(missing()),
        }
    }

    fn create_relative(&self, relative_path: &str) -> ResourceResult<Box<dyn Resource>> {
        Ok(Box::new(self.relative(relative_path)))
    }

    fn filename(&self) -> Option<String> {
        let path = self.file_path.to_string_lossy();
        let name = path
            .trim_end_matches(std::path::is_separator)
            .rsplit(std::path::is_separator)
            .next()
            .unwrap_or_default();
        Some(String::from(name))
    }
}

impl WritableResource for FileSystemResource {
    fn is_writable(&self) -> bool {
        self.file_system.is_writable(&self.file_path) && !self.is_directory()
    }

    fn output_stream(&self) -> ResourceResult<OutputStream> {
        match self.file_system.open_write(&self.file_path, OpenMode::Truncate) {
            Ok(stream) => Ok(Box::new(stream)),
            Err(error) => Err(ResourceError::from_native(error, &self.file_path)),
        }
    }

    fn writable_channel(&self) -> ResourceResult<Box<dyn WritableChannel>> {
        Ok(Box::new(self.write_channel()?))
    }
}

impl Display for FileSystemResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.description())
    }
}

impl PartialEq for FileSystemResource {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileSystemResource {}

impl Hash for FileSystemResource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state)
    }
}

impl From<&str> for FileSystemResource {
    fn from(path: &str) -> Self {
        FileSystemResource::new(path)
    }
}

impl From<&Path> for FileSystemResource {
    fn from(path: &Path) -> Self {
        FileSystemResource::from_path(path)
    }
}

impl From<PathBuf> for FileSystemResource {
    fn from(path: PathBuf) -> Self {
        FileSystemResource::from_path(path)
    }
}
