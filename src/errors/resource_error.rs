use std::io::{Error as IoError, ErrorKind};
use std::path::Path;

use thiserror::Error;
use url::ParseError;

/// Result of any fallible resource accessor.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// An error occurring while resolving or accessing a resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The resource or the requested location of it cannot be resolved.
    #[error("{0}")]
    NotFound(String),
    /// The location of the resource does not form a valid URI.
    #[error("Invalid URI [{uri}]")]
    InvalidUri {
        /// The offending textual form.
        uri: String,
        /// Why parsing failed.
        #[source]
        source: ParseError,
    },
    /// Any other failure raised by the underlying I/O.
    #[error(transparent)]
    Io(#[from] IoError),
}

impl ResourceError {
    /// Checks whether the error signals a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound(_))
    }

    /// The I/O error kind this error maps to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResourceError::NotFound(_) => ErrorKind::NotFound,
            ResourceError::InvalidUri { .. } => ErrorKind::InvalidData,
            ResourceError::Io(error) => error.kind(),
        }
    }

    /// Translates a native failure on `path`, folding "no such file" into
    /// [`ResourceError::NotFound`].
    pub(crate) fn from_native(error: IoError, path: &Path) -> Self {
        match error.kind() {
            ErrorKind::NotFound => {
                ResourceError::NotFound(format!("{} ({})", path.display(), error))
            }
            _ => ResourceError::Io(error),
        }
    }
}

impl From<ResourceError> for IoError {
    fn from(error: ResourceError) -> Self {
        match error {
            ResourceError::Io(error) => error,
            other => IoError::new(other.kind(), other),
        }
    }
}
