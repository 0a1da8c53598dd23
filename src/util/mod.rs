#[cfg(feature = "sqlite")]
mod meta_data;
mod string_path;
mod virtual_path;

#[cfg(feature = "sqlite")]
pub(crate) use self::meta_data::{Availability, MetaData};
pub use self::string_path::{apply_relative_path, clean_path};
pub use self::virtual_path::VirtualPath;
