use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::Result as IoResult;
use std::path::{Path, PathBuf};

use url::Url;

use super::{FileSystem, Metadata, OpenMode, SeekRead, SeekWrite};
use crate::errors::{ResourceError, ResourceResult};

/// The file system of the host, accessed through `std::fs`.
///
/// Permissions are probed by opening the entry, so they reflect what the current process may do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeFileSystem;

impl FileSystem for NativeFileSystem {
    fn is_native(&self) -> bool {
        true
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match env::current_dir() {
            Ok(current_dir) => current_dir.join(path),
            Err(error) => {
                log::debug!(
                    "Could not resolve current directory for {}: {}",
                    path.display(),
                    error
                );
                path.to_path_buf()
            }
        }
    }

    fn to_url(&self, path: &Path) -> ResourceResult<Url> {
        let absolute = self.absolute(path);
        let url = match absolute.is_dir() {
            true => Url::from_directory_path(&absolute),
            false => Url::from_file_path(&absolute),
        };
        url.map_err(|_| {
            ResourceError::NotFound(format!(
                "file [{}] cannot be resolved to URL",
                absolute.display()
            ))
        })
    }

    fn metadata(&self, path: &Path) -> IoResult<Metadata> {
        let metadata = fs::metadata(path)?;
        Ok(Metadata {
            len: metadata.len(),
            modified: metadata.modified().ok(),
            is_dir: metadata.is_dir(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_readable(&self, path: &Path) -> bool {
        File::open(path).is_ok()
    }

    fn is_writable(&self, path: &Path) -> bool {
        OpenOptions::new().write(true).open(path).is_ok()
    }

    fn open_read(&self, path: &Path) -> IoResult<Box<dyn SeekRead>> {
        Ok(Box::new(File::open(path)?))
    }

    fn open_write(&self, path: &Path, mode: OpenMode) -> IoResult<Box<dyn SeekWrite>> {
        let mut options = OpenOptions::new();
        options.write(true);
        if mode == OpenMode::Truncate {
            options.create(true).truncate(true);
        }
        Ok(Box::new(options.open(path)?))
    }
}
