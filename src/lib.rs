//! This crate provides uniform handles over byte-bearing resources: files on the host, files
//! stored in other file systems such as a SQLite database, and in-memory buffers.
#![deny(missing_docs)]

mod byte_array_resource;
pub mod channel;
pub mod errors;
pub mod file_system;
mod file_system_resource;
mod resource;
mod util;

pub use self::byte_array_resource::ByteArrayResource;
pub use self::errors::{ResourceError, ResourceResult};
pub use self::file_system_resource::FileSystemResource;
pub use self::resource::{Identity, InputStream, OutputStream, Resource, WritableResource};
pub use self::util::{apply_relative_path, clean_path, VirtualPath};

#[cfg(feature = "sqlite")]
pub use rusqlite::Connection as Database;
