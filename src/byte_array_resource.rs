use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::sync::Arc;

use crate::errors::ResourceResult;
use crate::resource::{Identity, InputStream, Resource};

/// A resource over an immutable in-memory buffer.
///
/// It always exists and may be read any number of times. Identity is given by the content.
#[derive(Debug, Clone)]
pub struct ByteArrayResource {
    byte_array: Arc<[u8]>,
    description: String,
}

impl ByteArrayResource {
    const DEFAULT_DESCRIPTION: &'static str = "resource loaded from byte array";

    /// Create a resource over the given bytes.
    pub fn new<T: Into<Arc<[u8]>>>(byte_array: T) -> Self {
        ByteArrayResource::with_description(byte_array, ByteArrayResource::DEFAULT_DESCRIPTION)
    }

    /// Create a resource whose description names where the bytes came from.
    pub fn with_description<T: Into<Arc<[u8]>>, D: Into<String>>(
        byte_array: T,
        description: D,
    ) -> Self {
        ByteArrayResource {
            byte_array: byte_array.into(),
            description: description.into(),
        }
    }

    /// The underlying bytes.
    pub fn byte_array(&self) -> &[u8] {
        &self.byte_array
    }
}

impl Resource for ByteArrayResource {
    fn description(&self) -> String {
        format!("Byte array resource [{}]", self.description)
    }

    fn identity(&self) -> Identity {
        Identity::Content(Arc::clone(&self.byte_array))
    }

    fn input_stream(&self) -> ResourceResult<InputStream> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.byte_array))))
    }

    fn exists(&self) -> bool {
        true
    }

    fn content_length(&self) -> ResourceResult<u64> {
        Ok(self.byte_array.len() as u64)
    }
}

impl PartialEq for ByteArrayResource {
    fn eq(&self, other: &Self) -> bool {
        self.byte_array == other.byte_array
    }
}

impl Eq for ByteArrayResource {}

impl Hash for ByteArrayResource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.byte_array.hash(state)
    }
}
