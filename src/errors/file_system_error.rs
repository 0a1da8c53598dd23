use rusqlite::Error as DatabaseError;
use thiserror::Error;

/// An error occurring during the loading of a SQLite-backed file system.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// The database neither contains a file system nor should one be created.
    #[error("No file system exists in the database and none should be created")]
    NoFileSystem,
    /// One of the underlying SQL statements is invalid. Should not occur in the wild.
    #[error("Preparing the base SQL command '{0}' failed")]
    InvalidBaseCommand(&'static str, #[source] DatabaseError),
    /// The stored file system has a version not supported by this version of the library.
    #[error("The file system version '{0}' is not compatible with the current library version")]
    UnsupportedVersion(u32),
    /// A general database error from SQLite.
    #[error("The underlying database failed ('{0}')")]
    Database(#[from] DatabaseError),
}
