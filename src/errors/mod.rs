//! Various errors occurring during access of resources and file systems.

#[cfg(feature = "sqlite")]
mod file_system_error;
mod resource_error;

#[cfg(feature = "sqlite")]
pub use self::file_system_error::FileSystemError;
pub use self::resource_error::{ResourceError, ResourceResult};
